//! Core library for juxta's compare workflow.
//!
//! The crate is layered around three primary responsibilities:
//! - resolving compare fragments into base/head repositories, refs and a commit range
//! - expanding collapsed diff regions from blob contents
//! - rendering diffs for a resolved range within configured limits
//!
//! Git access goes through [`backend::GitBackend`]; users, repositories and
//! permissions through [`directory::Directory`]. Both are passed in explicitly.

#![warn(
    clippy::all,
    clippy::cargo,
    clippy::nursery,
    clippy::pedantic,
    missing_docs
)]
#![cfg_attr(
    not(test),
    deny(
        clippy::dbg_macro,
        clippy::expect_used,
        clippy::panic,
        clippy::print_stderr,
        clippy::print_stdout,
        clippy::todo,
        clippy::unwrap_used
    )
)]

/// Git backend traits.
pub mod backend;
/// Mapping of core errors to request outcomes.
pub mod boundary;
/// Configuration loading.
pub mod config;
/// Diff rendering with size limits.
pub mod diff;
/// Directory access and permission checks.
pub mod directory;
/// Collapsed-region expansion.
pub mod excerpt;
/// libgit2-backed repository handles.
pub mod repository;
/// Compare fragment parsing.
pub mod request;
/// Compare resolution.
pub mod resolver;

pub use juxta_api::{
    CandidateRelation, CandidateRepository, CompareInfo, CompareSide, CompareSummary, Diff,
    DiffFile, DiffHunk, DiffLine, DiffLineKind, DiffRange, DiffStats, Excerpt, ExcerptWindow,
    ExpandDirection, FileStatus, ForkStrategy, HeadSource, IncompleteReason, Presentation,
    PullRequestDraft, RefKind, RepoName, ResolvedRef, Revision, RevisionRange, SectionInfo,
    Signature, WhitespaceMode,
};

/// Common result type for the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the core library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The compare fragment could not be parsed.
    #[error("malformed compare request {fragment:?}: {reason}")]
    MalformedRequest {
        /// Fragment as received.
        fragment: String,
        /// What was wrong with it.
        reason: &'static str,
    },
    /// A ref matched no commit, branch or tag.
    #[error("{side} ref not found: {reference}")]
    RefNotFound {
        /// Side the ref was given for.
        side: CompareSide,
        /// Ref as written by the caller.
        reference: String,
    },
    /// A repository does not exist.
    #[error("repository not found: {owner}/{name}")]
    RepoNotFound {
        /// Owner login, or the empty string when looked up by id.
        owner: String,
        /// Repository name or id.
        name: String,
    },
    /// A user does not exist.
    #[error("user not found: {name}")]
    UserNotFound {
        /// Login or id that was looked up.
        name: String,
    },
    /// The actor may not read the repository's code.
    ///
    /// Renders exactly like [`Error::RepoNotFound`] so callers cannot probe
    /// for private repositories.
    #[error("repository not found: {owner}/{name}")]
    PermissionDenied {
        /// Owner login.
        owner: String,
        /// Repository name.
        name: String,
    },
    /// The path does not exist at the commit, or is not a file.
    #[error("blob not found: {path} at {commit}")]
    BlobNotFound {
        /// Commit the path was looked up in.
        commit: String,
        /// Repository-relative path.
        path: String,
    },
    /// Reading blob contents failed midway.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Repository-relative path.
        path: String,
        /// Source I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Underlying git operation failed.
    #[error("git error: {source}")]
    Git {
        /// Original libgit2 error bubbled up by the core library.
        #[from]
        source: git2::Error,
    },
    /// The directory backend failed.
    #[error("directory error: {source}")]
    Directory {
        /// Original directory error.
        #[source]
        source: juxta_directory_api::DirectoryError,
    },
    /// Provided path does not correspond to a git repository.
    #[error("path does not reference a git repository: {path}")]
    NotARepository {
        /// Path that failed to resolve to a repository.
        path: String,
    },
    /// Filesystem interaction failed.
    #[error("failed to access {path}: {source}")]
    Io {
        /// Filesystem path involved in the failed operation.
        path: String,
        /// Source I/O error returned by the standard library.
        #[source]
        source: std::io::Error,
    },
    /// Configuration could not be loaded or is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Human-readable description.
        message: String,
    },
}

impl Error {
    /// Whether the error comes from an unavailable collaborator (git or directory).
    #[must_use]
    pub const fn is_backend_unavailable(&self) -> bool {
        matches!(self, Self::Git { .. } | Self::Directory { .. })
    }
}
