//! Git collaborator used by the resolver, the paginator and the diff engine.
//!
//! [`GitBackend`] opens repositories; the returned [`GitHandle`] answers every
//! question the compare flow asks of a single repository. Handles are released
//! when dropped. [`crate::repository::Git2Backend`] is the libgit2 implementation.

use std::io::BufRead;
use std::sync::Arc;

use camino::Utf8Path;
use juxta_api::{CompareInfo, DiffFile, RefKind, ResolvedRef, Revision, WhitespaceMode};

use crate::Result;

/// Factory for repository handles.
pub trait GitBackend: Send + Sync {
    /// Open the repository stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotARepository`] when `path` holds no repository
    /// and backend errors for anything else.
    fn open(&self, path: &Utf8Path) -> Result<Box<dyn GitHandle>>;
}

/// Handle shared between the base and head sides of a comparison.
pub type SharedHandle = Arc<dyn GitHandle>;

/// Parameters of [`GitHandle::compare_info`].
#[derive(Debug, Clone, Copy)]
pub struct RangeRequest<'a> {
    /// Location of the base repository; may be the handle's own repository.
    pub base_path: &'a Utf8Path,
    /// Fully qualified base ref or commit id, resolved in the base repository.
    pub base_ref: &'a str,
    /// Fully qualified head ref or commit id, resolved in this repository.
    pub head_ref: &'a str,
    /// Skip merge-base adjustment.
    pub direct: bool,
    /// Skip listing commits.
    pub file_only: bool,
}

/// Operations on one opened repository.
pub trait GitHandle: Send {
    /// Location the handle was opened from.
    fn path(&self) -> &Utf8Path;

    /// Whether `name` is a full-length id of an existing commit.
    ///
    /// # Errors
    ///
    /// Propagates backend failures other than absence.
    fn is_commit(&self, name: &str) -> Result<bool>;

    /// Whether `refs/heads/<name>` exists.
    ///
    /// # Errors
    ///
    /// Propagates backend failures other than absence.
    fn is_branch(&self, name: &str) -> Result<bool>;

    /// Whether `refs/tags/<name>` exists.
    ///
    /// # Errors
    ///
    /// Propagates backend failures other than absence.
    fn is_tag(&self, name: &str) -> Result<bool>;

    /// Expand an abbreviated commit id to the full id.
    ///
    /// Returns `Ok(None)` when `name` is not hex, too short, ambiguous or unknown.
    ///
    /// # Errors
    ///
    /// Propagates backend failures other than absence.
    fn resolve_short_commit(&self, name: &str) -> Result<Option<String>>;

    /// Commit metadata for any revision expression that peels to a commit.
    ///
    /// # Errors
    ///
    /// Fails when the revision does not exist or is not a commit.
    fn commit(&self, revision: &str) -> Result<Revision>;

    /// Branch names in name order, skipping `offset`; `limit == 0` means all.
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    fn branches(&self, offset: usize, limit: usize) -> Result<Vec<String>>;

    /// Tag names in name order, skipping `offset`; `limit == 0` means all.
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    fn tags(&self, offset: usize, limit: usize) -> Result<Vec<String>>;

    /// Merge base, endpoints, commits and changed-file count of a range.
    ///
    /// # Errors
    ///
    /// Fails when either ref cannot be resolved or the base repository cannot
    /// be opened.
    fn compare_info(&self, request: &RangeRequest<'_>) -> Result<CompareInfo>;

    /// Stream the contents of `path` as of `commit`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::BlobNotFound`] when the path is missing or not a
    /// file.
    fn blob_reader<'a>(&'a self, commit: &str, path: &Utf8Path) -> Result<Box<dyn BufRead + 'a>>;

    /// File-level diff between two commits, without any size limits applied.
    ///
    /// # Errors
    ///
    /// Fails when either commit cannot be resolved.
    fn diff_files(
        &self,
        before: &str,
        after: &str,
        whitespace: WhitespaceMode,
    ) -> Result<Vec<DiffFile>>;
}

/// Classify `name` against `handle`.
///
/// Order: full commit id, branch, tag, abbreviated commit id. Abbreviated ids
/// come back expanded. `Ok(None)` means nothing matched.
///
/// # Errors
///
/// Propagates backend failures from the existence checks.
pub fn classify_ref(handle: &dyn GitHandle, name: &str) -> Result<Option<ResolvedRef>> {
    if handle.is_commit(name)? {
        return Ok(Some(ResolvedRef::new(name, RefKind::Commit)));
    }
    if handle.is_branch(name)? {
        return Ok(Some(ResolvedRef::new(name, RefKind::Branch)));
    }
    if handle.is_tag(name)? {
        return Ok(Some(ResolvedRef::new(name, RefKind::Tag)));
    }
    Ok(handle
        .resolve_short_commit(name)?
        .map(|id| ResolvedRef::new(id, RefKind::Commit)))
}
