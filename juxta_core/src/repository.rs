//! Repository access built on top of libgit2.

use std::cell::RefCell;
use std::fmt;
use std::io::{self, BufRead, Read};
use std::path::{Path, PathBuf};

use camino::{Utf8Path, Utf8PathBuf};
use git2::{
    BranchType, Delta, DiffFindOptions, DiffOptions, ErrorCode, ObjectType, Oid, Patch,
    Repository as GitRepository, Sort,
};
use juxta_api::{
    CompareInfo, DiffFile, DiffHunk, DiffLine, DiffLineKind, DiffRange, DiffStats, FileStatus,
    Revision, Signature, WhitespaceMode,
};
use tracing::debug;

use crate::backend::{GitBackend, GitHandle, RangeRequest};
use crate::{Error, Result};

/// Shortest abbreviated commit id accepted when classifying refs.
const MIN_SHORT_ID_LEN: usize = 4;

/// [`GitBackend`] that opens repositories with libgit2.
#[derive(Debug, Default, Clone, Copy)]
pub struct Git2Backend;

impl Git2Backend {
    /// Construct the backend.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl GitBackend for Git2Backend {
    fn open(&self, path: &Utf8Path) -> Result<Box<dyn GitHandle>> {
        Ok(Box::new(Repository::open(path)?))
    }
}

/// Handle to a hosted repository, bare or with a working tree.
pub struct Repository {
    inner: GitRepository,
    path: Utf8PathBuf,
    /// Object directories already added as alternates.
    alternates: RefCell<Vec<PathBuf>>,
}

impl Repository {
    /// Open the repository stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotARepository`] when libgit2 finds no repository at
    /// `path`, and [`Error::Git`] for any other failure.
    pub fn open(path: impl AsRef<Utf8Path>) -> Result<Self> {
        let path = path.as_ref();
        let repo = match GitRepository::open(path) {
            Ok(repo) => repo,
            Err(err) if err.code() == ErrorCode::NotFound => {
                return Err(Error::NotARepository {
                    path: path.to_string(),
                })
            }
            Err(err) => return Err(Error::from(err)),
        };
        debug!(path = %path, bare = repo.is_bare(), "opened repository");

        Ok(Self {
            inner: repo,
            path: path.to_owned(),
            alternates: RefCell::new(Vec::new()),
        })
    }

    /// The underlying libgit2 repository.
    #[must_use]
    pub const fn git_repo(&self) -> &GitRepository {
        &self.inner
    }

    fn peel_commit(&self, revision: &str) -> Result<git2::Commit<'_>> {
        Ok(self.inner.revparse_single(revision)?.peel_to_commit()?)
    }

    fn reference_exists(&self, name: &str) -> Result<bool> {
        match self.inner.find_reference(name) {
            Ok(_) => Ok(true),
            Err(err) if matches!(err.code(), ErrorCode::NotFound | ErrorCode::InvalidSpec) => {
                Ok(false)
            }
            Err(err) => Err(Error::from(err)),
        }
    }

    /// Resolve the base commit of a range, borrowing objects from the base
    /// repository when it is a different one.
    fn resolve_base(&self, base_path: &Utf8Path, base_ref: &str) -> Result<Oid> {
        if same_location(base_path, &self.path) {
            return Ok(self.peel_commit(base_ref)?.id());
        }

        let base = match GitRepository::open(base_path) {
            Ok(repo) => repo,
            Err(err) if err.code() == ErrorCode::NotFound => {
                return Err(Error::NotARepository {
                    path: base_path.to_string(),
                })
            }
            Err(err) => return Err(Error::from(err)),
        };
        let oid = base.revparse_single(base_ref)?.peel_to_commit()?.id();

        let objects = base.path().join("objects");
        if self.alternates.borrow().contains(&objects) {
            return Ok(oid);
        }
        self.inner
            .odb()?
            .add_disk_alternate(&objects.to_string_lossy())?;
        self.alternates.borrow_mut().push(objects);
        debug!(base = %base_path, head = %self.path, "linked base objects into head repository");
        Ok(oid)
    }

    fn range_commits(&self, head: Oid, hide: Oid) -> Result<Vec<Revision>> {
        let mut walk = self.inner.revwalk()?;
        walk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        walk.push(head)?;
        walk.hide(hide)?;

        let mut commits = Vec::new();
        for oid in walk {
            let commit = self.inner.find_commit(oid?)?;
            commits.push(commit_to_revision(&commit, None));
        }
        Ok(commits)
    }

    fn changed_files(&self, before: Oid, after: Oid) -> Result<usize> {
        let before_tree = self.inner.find_commit(before)?.tree()?;
        let after_tree = self.inner.find_commit(after)?.tree()?;
        let diff = self
            .inner
            .diff_tree_to_tree(Some(&before_tree), Some(&after_tree), None)?;
        Ok(diff.stats()?.files_changed())
    }
}

impl GitHandle for Repository {
    fn path(&self) -> &Utf8Path {
        &self.path
    }

    fn is_commit(&self, name: &str) -> Result<bool> {
        if !is_full_commit_id(name) {
            return Ok(false);
        }
        let oid = Oid::from_str(name)?;
        match self.inner.find_commit(oid) {
            Ok(_) => Ok(true),
            Err(err) if err.code() == ErrorCode::NotFound => Ok(false),
            Err(err) => Err(Error::from(err)),
        }
    }

    fn is_branch(&self, name: &str) -> Result<bool> {
        self.reference_exists(&format!("{}{name}", juxta_api::BRANCH_PREFIX))
    }

    fn is_tag(&self, name: &str) -> Result<bool> {
        self.reference_exists(&format!("{}{name}", juxta_api::TAG_PREFIX))
    }

    fn resolve_short_commit(&self, name: &str) -> Result<Option<String>> {
        if name.len() < MIN_SHORT_ID_LEN || !name.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Ok(None);
        }
        let object = match self.inner.revparse_single(name) {
            Ok(object) => object,
            Err(err) if is_unresolvable(&err) => return Ok(None),
            Err(err) => return Err(Error::from(err)),
        };
        match object.peel_to_commit() {
            Ok(commit) => Ok(Some(commit.id().to_string())),
            Err(err) if is_unresolvable(&err) => Ok(None),
            Err(err) => Err(Error::from(err)),
        }
    }

    fn commit(&self, revision: &str) -> Result<Revision> {
        let commit = self.peel_commit(revision)?;
        Ok(commit_to_revision(&commit, None))
    }

    fn branches(&self, offset: usize, limit: usize) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for branch in self.inner.branches(Some(BranchType::Local))? {
            let (branch, _) = branch?;
            if let Some(name) = branch.name()? {
                names.push(name.to_owned());
            }
        }
        Ok(page(names, offset, limit))
    }

    fn tags(&self, offset: usize, limit: usize) -> Result<Vec<String>> {
        let names = self
            .inner
            .tag_names(None)?
            .iter()
            .flatten()
            .map(str::to_owned)
            .collect();
        Ok(page(names, offset, limit))
    }

    fn compare_info(&self, request: &RangeRequest<'_>) -> Result<CompareInfo> {
        let base = self.resolve_base(request.base_path, request.base_ref)?;
        let head = self.peel_commit(request.head_ref)?.id();

        let (merge_base, related) = match self.inner.merge_base(base, head) {
            Ok(oid) => (oid, true),
            Err(err) if err.code() == ErrorCode::NotFound => (base, false),
            Err(err) => return Err(Error::from(err)),
        };
        let start = if request.direct { base } else { merge_base };

        let commits = if request.file_only || !related {
            Vec::new()
        } else {
            self.range_commits(head, start)?
        };
        let files_changed = self.changed_files(start, head)?;

        debug!(
            base = %base,
            head = %head,
            merge_base = %merge_base,
            related,
            commits = commits.len(),
            "computed compare range"
        );
        Ok(CompareInfo {
            merge_base: merge_base.to_string(),
            base_commit_id: base.to_string(),
            head_commit_id: head.to_string(),
            commits,
            files_changed,
        })
    }

    fn blob_reader<'a>(&'a self, commit: &str, path: &Utf8Path) -> Result<Box<dyn BufRead + 'a>> {
        let not_found = || Error::BlobNotFound {
            commit: commit.to_owned(),
            path: path.to_string(),
        };

        let tree = self.peel_commit(commit)?.tree()?;
        let entry = match tree.get_path(path.as_std_path()) {
            Ok(entry) => entry,
            Err(err) if err.code() == ErrorCode::NotFound => return Err(not_found()),
            Err(err) => return Err(Error::from(err)),
        };
        if entry.kind() != Some(ObjectType::Blob) {
            return Err(not_found());
        }

        let blob = self.inner.find_blob(entry.id())?;
        Ok(Box::new(BlobReader { blob, position: 0 }))
    }

    fn diff_files(
        &self,
        before: &str,
        after: &str,
        whitespace: WhitespaceMode,
    ) -> Result<Vec<DiffFile>> {
        let before_tree = self.peel_commit(before)?.tree()?;
        let after_tree = self.peel_commit(after)?.tree()?;

        let mut options = DiffOptions::new();
        match whitespace {
            WhitespaceMode::ShowAll => {}
            WhitespaceMode::IgnoreAll => {
                options.ignore_whitespace(true);
            }
            WhitespaceMode::IgnoreChange => {
                options.ignore_whitespace_change(true);
            }
            WhitespaceMode::IgnoreEol => {
                options.ignore_whitespace_eol(true);
            }
        }

        let mut diff = self.inner.diff_tree_to_tree(
            Some(&before_tree),
            Some(&after_tree),
            Some(&mut options),
        )?;
        let mut find = DiffFindOptions::new();
        find.renames(true).copies(true).copies_from_unmodified(true);
        diff.find_similar(Some(&mut find))?;

        let mut files = Vec::with_capacity(diff.deltas().len());
        for index in 0..diff.deltas().len() {
            let patch = Patch::from_diff(&diff, index)?;
            let Some(delta) = diff.get_delta(index) else {
                continue;
            };
            files.push(convert_file(&delta, patch.as_ref())?);
        }
        Ok(files)
    }
}

/// Zero-copy reader over a blob's contents.
struct BlobReader<'repo> {
    blob: git2::Blob<'repo>,
    position: usize,
}

impl Read for BlobReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let count = available.len().min(buf.len());
        buf[..count].copy_from_slice(&available[..count]);
        self.consume(count);
        Ok(count)
    }
}

impl BufRead for BlobReader<'_> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        let content = self.blob.content();
        Ok(&content[self.position.min(content.len())..])
    }

    fn consume(&mut self, amount: usize) {
        self.position = (self.position + amount).min(self.blob.content().len());
    }
}

fn convert_file(delta: &git2::DiffDelta<'_>, patch: Option<&Patch<'_>>) -> Result<DiffFile> {
    let status = file_status(delta.status());
    let path = delta
        .new_file()
        .path()
        .or_else(|| delta.old_file().path())
        .map(display_path)
        .unwrap_or_default();
    let old_path = if matches!(status, FileStatus::Renamed | FileStatus::Copied) {
        delta.old_file().path().map(display_path)
    } else {
        None
    };

    let mut file = DiffFile {
        path,
        old_path,
        status,
        stats: DiffStats::ZERO,
        is_binary: delta.flags().is_binary(),
        is_incomplete: false,
        incomplete_reason: None,
        hunks: Vec::new(),
    };
    let Some(patch) = patch else {
        return Ok(file);
    };

    file.is_binary |= patch.delta().flags().is_binary();
    let (_, additions, deletions) = patch.line_stats()?;
    file.stats = DiffStats::new(saturate(additions), saturate(deletions));

    for hunk_index in 0..patch.num_hunks() {
        let (hunk, line_count) = patch.hunk(hunk_index)?;
        let mut lines = Vec::with_capacity(line_count);
        for line_index in 0..line_count {
            let line = patch.line_in_hunk(hunk_index, line_index)?;
            let kind = match line.origin() {
                '+' => DiffLineKind::Addition,
                '-' => DiffLineKind::Deletion,
                ' ' => DiffLineKind::Context,
                // end-of-file newline markers
                _ => continue,
            };
            lines.push(DiffLine {
                kind,
                text: trim_line_ending(&String::from_utf8_lossy(line.content())).to_owned(),
                base_line: line.old_lineno(),
                head_line: line.new_lineno(),
                section: None,
            });
        }
        file.hunks.push(DiffHunk {
            header: DiffRange {
                base_start: hunk.old_start(),
                base_lines: hunk.old_lines(),
                head_start: hunk.new_start(),
                head_lines: hunk.new_lines(),
            },
            section: hunk_section(hunk.header()),
            lines,
        });
    }

    Ok(file)
}

const fn file_status(delta: Delta) -> FileStatus {
    match delta {
        Delta::Added | Delta::Untracked => FileStatus::Added,
        Delta::Deleted => FileStatus::Deleted,
        Delta::Renamed => FileStatus::Renamed,
        Delta::Copied => FileStatus::Copied,
        Delta::Typechange => FileStatus::TypeChange,
        _ => FileStatus::Modified,
    }
}

/// Text after the closing `@@` of a hunk header, e.g. the enclosing function.
fn hunk_section(header: &[u8]) -> Option<String> {
    let header = String::from_utf8_lossy(header);
    let rest = header.strip_prefix("@@")?;
    let (_, section) = rest.split_once("@@")?;
    let section = section.trim();
    (!section.is_empty()).then(|| section.to_owned())
}

pub(crate) fn trim_line_ending(text: &str) -> &str {
    let text = text.strip_suffix('\n').unwrap_or(text);
    text.strip_suffix('\r').unwrap_or(text)
}

fn saturate(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

fn page(mut names: Vec<String>, offset: usize, limit: usize) -> Vec<String> {
    names.sort();
    let rest = names.into_iter().skip(offset);
    if limit == 0 {
        rest.collect()
    } else {
        rest.take(limit).collect()
    }
}

fn is_full_commit_id(name: &str) -> bool {
    matches!(name.len(), 40 | 64) && name.bytes().all(|b| b.is_ascii_hexdigit())
}

fn is_unresolvable(err: &git2::Error) -> bool {
    matches!(
        err.code(),
        ErrorCode::NotFound | ErrorCode::Ambiguous | ErrorCode::InvalidSpec | ErrorCode::Peel
    )
}

fn same_location(a: &Utf8Path, b: &Utf8Path) -> bool {
    if a == b {
        return true;
    }
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn commit_to_revision(commit: &git2::Commit<'_>, reference: Option<String>) -> Revision {
    let author = commit.author();
    let committer = commit.committer();
    Revision {
        oid: commit.id().to_string(),
        reference,
        summary: commit.summary().map(str::to_owned),
        message: commit.message().map(str::to_owned),
        author: convert_signature(&author),
        committer: convert_signature(&committer),
        timestamp: Some(commit.time().seconds()),
    }
}

fn convert_signature(signature: &git2::Signature<'_>) -> Option<Signature> {
    signature.name().map(|name| Signature {
        name: name.to_owned(),
        email: signature.email().map(str::to_owned),
    })
}

fn display_path(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::classify_ref;
    use juxta_api::RefKind;
    use tempfile::TempDir;

    #[test]
    fn open_non_repository_returns_error() {
        let temp = TempDir::new().expect("tempdir");
        let path = Utf8Path::from_path(temp.path()).expect("utf-8 tempdir");
        let err = Repository::open(path);
        assert!(matches!(err, Err(Error::NotARepository { .. })));
    }

    #[test]
    fn opens_bare_repositories() -> Result<()> {
        let temp = TempDir::new().expect("tempdir");
        let path = Utf8Path::from_path(temp.path()).expect("utf-8 tempdir").join("bare.git");
        GitRepository::init_bare(&path)?;

        let repo = Repository::open(&path)?;
        assert!(repo.git_repo().is_bare());
        assert_eq!(GitHandle::path(&repo), path);
        Ok(())
    }

    #[test]
    fn classification_prefers_commit_then_branch_then_tag() -> Result<()> {
        let temp = TempDir::new().expect("tempdir");
        let git_repo = GitRepository::init(temp.path())?;
        let first = commit_file(&git_repo, "README.md", "hello\n", "Initial commit")?;
        let head = git_repo.find_commit(first)?;
        git_repo.branch("feature", &head, false)?;
        git_repo.tag_lightweight("v1.0", head.as_object(), false)?;

        let repo = Repository::open(Utf8Path::from_path(temp.path()).expect("utf-8 tempdir"))?;
        let full = first.to_string();

        let commit = classify_ref(&repo, &full)?.expect("commit");
        assert_eq!(commit.kind, RefKind::Commit);
        assert_eq!(commit.name, full);

        let branch = classify_ref(&repo, "feature")?.expect("branch");
        assert_eq!(branch.kind, RefKind::Branch);

        let tag = classify_ref(&repo, "v1.0")?.expect("tag");
        assert_eq!(tag.kind, RefKind::Tag);

        let short = classify_ref(&repo, &full[..7])?.expect("short commit");
        assert_eq!(short.kind, RefKind::Commit);
        assert_eq!(short.name, full);

        assert!(classify_ref(&repo, "missing")?.is_none());
        assert!(classify_ref(&repo, "not a ref")?.is_none());
        assert!(classify_ref(&repo, "abc")?.is_none());
        Ok(())
    }

    #[test]
    fn branch_and_tag_listing_pages() -> Result<()> {
        let temp = TempDir::new().expect("tempdir");
        let git_repo = GitRepository::init(temp.path())?;
        let oid = commit_file(&git_repo, "a.txt", "a\n", "Initial commit")?;
        let commit = git_repo.find_commit(oid)?;
        for name in ["c", "a", "b"] {
            git_repo.branch(&format!("topic-{name}"), &commit, false)?;
            git_repo.tag_lightweight(&format!("v-{name}"), commit.as_object(), false)?;
        }

        let repo = Repository::open(Utf8Path::from_path(temp.path()).expect("utf-8 tempdir"))?;
        let branches = repo.branches(0, 0)?;
        assert!(branches.contains(&"topic-a".to_owned()));
        assert_eq!(branches.len(), 4);

        assert_eq!(repo.tags(0, 0)?, vec!["v-a", "v-b", "v-c"]);
        assert_eq!(repo.tags(1, 1)?, vec!["v-b"]);
        assert!(repo.tags(5, 0)?.is_empty());
        Ok(())
    }

    #[test]
    fn blob_reader_streams_contents() -> Result<()> {
        let temp = TempDir::new().expect("tempdir");
        let git_repo = GitRepository::init(temp.path())?;
        let oid = commit_file(&git_repo, "notes.txt", "one\ntwo\n", "Initial commit")?;

        let repo = Repository::open(Utf8Path::from_path(temp.path()).expect("utf-8 tempdir"))?;
        let mut contents = String::new();
        repo.blob_reader(&oid.to_string(), Utf8Path::new("notes.txt"))?
            .read_to_string(&mut contents)
            .expect("read blob");
        assert_eq!(contents, "one\ntwo\n");

        let missing = repo.blob_reader(&oid.to_string(), Utf8Path::new("absent.txt"));
        assert!(matches!(missing, Err(Error::BlobNotFound { .. })));
        Ok(())
    }

    #[test]
    fn base_objects_are_linked_once_per_handle() -> Result<()> {
        let temp = TempDir::new().expect("tempdir");
        let root = Utf8Path::from_path(temp.path()).expect("utf-8 tempdir");
        let upstream_path = root.join("upstream");
        let upstream = GitRepository::init(&upstream_path)?;
        commit_file(&upstream, "README.md", "hello\n", "Initial commit")?;
        let fork_path = root.join("fork");
        GitRepository::clone(upstream_path.as_str(), &fork_path)?;
        let base = commit_file(&upstream, "README.md", "hello\nworld\n", "Upstream only")?;

        let fork = Repository::open(&fork_path)?;
        let request = RangeRequest {
            base_path: &upstream_path,
            base_ref: "HEAD",
            head_ref: "HEAD",
            direct: false,
            file_only: false,
        };
        let first = fork.compare_info(&request)?;
        let second = fork.compare_info(&request)?;

        assert_eq!(first, second);
        assert_eq!(first.base_commit_id, base.to_string());
        assert_eq!(fork.alternates.borrow().len(), 1);
        Ok(())
    }

    #[test]
    fn hunk_section_extracts_trailing_text() {
        assert_eq!(
            hunk_section(b"@@ -1,3 +1,4 @@ fn main() {\n").as_deref(),
            Some("fn main() {")
        );
        assert_eq!(hunk_section(b"@@ -1 +1 @@\n"), None);
        assert_eq!(trim_line_ending("line\r\n"), "line");
    }

    fn commit_file(
        repo: &GitRepository,
        name: &str,
        contents: &str,
        message: &str,
    ) -> Result<Oid> {
        let workdir = repo.workdir().expect("non-bare repository");
        std::fs::write(workdir.join(name), contents).expect("write file");
        let mut index = repo.index()?;
        index.add_path(Path::new(name))?;
        index.write()?;
        let tree = repo.find_tree(index.write_tree()?)?;
        let signature = git2::Signature::now("Test User", "test@example.com")?;
        let parents = match repo.head() {
            Ok(head) => vec![head.peel_to_commit()?],
            Err(_) => Vec::new(),
        };
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
        Ok(repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &parent_refs,
        )?)
    }
}
