#![allow(dead_code)]

use std::fs;
use std::io::BufRead;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use git2::{
    build::CheckoutBuilder, ErrorClass, ErrorCode, IndexAddOption, Oid,
    Repository as GitRepository, RepositoryInitOptions,
};
use juxta_core::backend::{GitBackend, GitHandle, RangeRequest};
use juxta_core::repository::Git2Backend;
use juxta_core::resolver::CompareResolver;
use juxta_core::{CompareInfo, DiffFile, Error, Result, Revision, WhitespaceMode};
use juxta_directory::{StaticDirectory, StaticDirectoryBuilder};
use juxta_directory_api::{RepoId, UserId};
use tempfile::TempDir;

/// Users and repositories registered by [`Fixture::directory`].
#[derive(Debug, Clone, Copy)]
pub struct Ids {
    pub alice: UserId,
    pub bob: UserId,
    pub carol: UserId,
    pub dave: UserId,
    pub erin: UserId,
    pub upstream: RepoId,
    pub bob_fork: RepoId,
    pub carol_fork: RepoId,
    pub secret: RepoId,
}

/// On-disk repositories:
///
/// - `alice/widget`: `main` (two commits, tags `v1.0` and `v1.1`) and
///   `develop` (one commit ahead of `main`)
/// - `bob/widget`: clone of `alice/widget` with `feature` one commit ahead
/// - `carol/widget`: clone of `alice/widget` with `fix` one commit ahead
/// - `erin/secret`: unrelated private repository with `main`
pub struct Fixture {
    _temp: TempDir,
    pub root: Utf8PathBuf,
    pub main_initial: Oid,
    pub main_head: Oid,
    pub develop_head: Oid,
    pub feature_head: Oid,
    pub fix_head: Oid,
}

impl Fixture {
    pub fn new() -> Result<Self> {
        let temp = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf-8 tempdir");

        let upstream = init_repo(root.join("alice/widget"))?;
        write_file(&upstream, "README.md", "hello\n");
        let main_initial = commit_all(&upstream, "Initial commit")?;
        tag(&upstream, "v1.0", main_initial)?;
        write_file(&upstream, "README.md", "hello\nworld\n");
        let main_head = commit_all(&upstream, "Second commit")?;
        tag(&upstream, "v1.1", main_head)?;

        switch_to_new_branch(&upstream, "develop")?;
        write_file(&upstream, "develop.txt", "work in progress\n");
        let develop_head = commit_all(&upstream, "Add develop work\n\nLonger description.\n")?;
        switch_to_branch(&upstream, "main")?;

        let bob = clone_repo(&root.join("alice/widget"), &root.join("bob/widget"))?;
        switch_to_new_branch(&bob, "feature")?;
        write_file(&bob, "feature.txt", "feature\n");
        let feature_head = commit_all(&bob, "Add feature")?;

        let carol = clone_repo(&root.join("alice/widget"), &root.join("carol/widget"))?;
        switch_to_new_branch(&carol, "fix")?;
        write_file(&carol, "README.md", "hello\nworld!\n");
        let fix_head = commit_all(&carol, "Fix typo")?;

        let secret = init_repo(root.join("erin/secret"))?;
        write_file(&secret, "plans.txt", "classified\n");
        commit_all(&secret, "Initial commit")?;

        Ok(Self {
            _temp: temp,
            root,
            main_initial,
            main_head,
            develop_head,
            feature_head,
            fix_head,
        })
    }

    pub fn path(&self, relative: &str) -> Utf8PathBuf {
        self.root.join(relative)
    }

    /// Directory over the fixture repositories; `customize` may tweak access.
    pub fn directory(
        &self,
        customize: impl FnOnce(&mut StaticDirectoryBuilder, &Ids),
    ) -> (Arc<StaticDirectory>, Ids) {
        let mut builder = StaticDirectory::builder();
        let alice = builder.user("alice");
        let bob = builder.user("bob");
        let carol = builder.user("carol");
        let dave = builder.user("dave");
        let erin = builder.user("erin");

        let upstream = builder
            .repository(alice, "widget", self.path("alice/widget"))
            .expect("alice registered");
        let bob_fork = builder
            .fork(bob, upstream, "widget", self.path("bob/widget"))
            .expect("bob registered");
        let carol_fork = builder
            .fork(carol, upstream, "widget", self.path("carol/widget"))
            .expect("carol registered");
        let secret = builder
            .repository(erin, "secret", self.path("erin/secret"))
            .expect("erin registered");
        builder.make_private(secret);

        let ids = Ids {
            alice,
            bob,
            carol,
            dave,
            erin,
            upstream,
            bob_fork,
            carol_fork,
            secret,
        };
        customize(&mut builder, &ids);
        (Arc::new(builder.build()), ids)
    }

    /// Resolver over the default directory and a handle-counting backend.
    pub fn resolver(&self) -> (CompareResolver, Counters, Ids) {
        self.resolver_with(|_, _| {})
    }

    pub fn resolver_with(
        &self,
        customize: impl FnOnce(&mut StaticDirectoryBuilder, &Ids),
    ) -> (CompareResolver, Counters, Ids) {
        let (directory, ids) = self.directory(customize);
        let backend = CountingBackend::default();
        let counters = backend.counters.clone();
        (
            CompareResolver::new(directory, Arc::new(backend)),
            counters,
            ids,
        )
    }
}

/// Open and live handle counts shared with a [`CountingBackend`].
#[derive(Debug, Clone, Default)]
pub struct Counters {
    opened: Arc<AtomicUsize>,
    live: Arc<AtomicUsize>,
}

impl Counters {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

/// Backend wrapping [`Git2Backend`] that tracks every handle it hands out.
#[derive(Debug, Default)]
pub struct CountingBackend {
    inner: Git2Backend,
    counters: Counters,
}

impl GitBackend for CountingBackend {
    fn open(&self, path: &Utf8Path) -> Result<Box<dyn GitHandle>> {
        let inner = self.inner.open(path)?;
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        self.counters.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(TrackedHandle {
            inner,
            live: Arc::clone(&self.counters.live),
        }))
    }
}

struct TrackedHandle {
    inner: Box<dyn GitHandle>,
    live: Arc<AtomicUsize>,
}

impl Drop for TrackedHandle {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl GitHandle for TrackedHandle {
    fn path(&self) -> &Utf8Path {
        self.inner.path()
    }

    fn is_commit(&self, name: &str) -> Result<bool> {
        self.inner.is_commit(name)
    }

    fn is_branch(&self, name: &str) -> Result<bool> {
        self.inner.is_branch(name)
    }

    fn is_tag(&self, name: &str) -> Result<bool> {
        self.inner.is_tag(name)
    }

    fn resolve_short_commit(&self, name: &str) -> Result<Option<String>> {
        self.inner.resolve_short_commit(name)
    }

    fn commit(&self, revision: &str) -> Result<Revision> {
        self.inner.commit(revision)
    }

    fn branches(&self, offset: usize, limit: usize) -> Result<Vec<String>> {
        self.inner.branches(offset, limit)
    }

    fn tags(&self, offset: usize, limit: usize) -> Result<Vec<String>> {
        self.inner.tags(offset, limit)
    }

    fn compare_info(&self, request: &RangeRequest<'_>) -> Result<CompareInfo> {
        self.inner.compare_info(request)
    }

    fn blob_reader<'a>(&'a self, commit: &str, path: &Utf8Path) -> Result<Box<dyn BufRead + 'a>> {
        self.inner.blob_reader(commit, path)
    }

    fn diff_files(
        &self,
        before: &str,
        after: &str,
        whitespace: WhitespaceMode,
    ) -> Result<Vec<DiffFile>> {
        self.inner.diff_files(before, after, whitespace)
    }
}

pub fn init_repo(path: impl AsRef<Path>) -> Result<GitRepository> {
    let path = path.as_ref();
    fs::create_dir_all(path).expect("create repository directory");
    let mut options = RepositoryInitOptions::new();
    options.initial_head("main");
    Ok(GitRepository::init_opts(path, &options)?)
}

pub fn clone_repo(from: &Utf8Path, to: &Utf8Path) -> Result<GitRepository> {
    fs::create_dir_all(to.parent().expect("clone parent")).expect("create clone parent");
    Ok(GitRepository::clone(from.as_str(), to)?)
}

pub fn write_file(repo: &GitRepository, name: &str, contents: &str) {
    let path = repo.workdir().expect("non-bare repository").join(name);
    fs::create_dir_all(path.parent().expect("path should have a parent directory"))
        .expect("create directories");
    fs::write(path, contents).expect("write file");
}

pub fn commit_all(repo: &GitRepository, message: &str) -> Result<Oid> {
    let parents = match repo.head() {
        Ok(reference) => vec![reference.peel_to_commit()?],
        Err(err)
            if matches!(
                (err.class(), err.code()),
                (
                    ErrorClass::Reference,
                    ErrorCode::NotFound | ErrorCode::UnbornBranch
                )
            ) =>
        {
            Vec::new()
        }
        Err(err) => return Err(Error::from(err)),
    };
    let parent_refs: Vec<&git2::Commit> = parents.iter().collect();

    let mut index = repo.index()?;
    index.add_all(["*"], IndexAddOption::DEFAULT, None)?;
    index.update_all(["*"], None)?;
    index.write()?;
    let tree = repo.find_tree(index.write_tree()?)?;
    let signature = git2::Signature::now("Test User", "test@example.com")?;

    Ok(repo.commit(
        Some("HEAD"),
        &signature,
        &signature,
        message,
        &tree,
        &parent_refs,
    )?)
}

pub fn tag(repo: &GitRepository, name: &str, target: Oid) -> Result<()> {
    let object = repo.find_object(target, None)?;
    repo.tag_lightweight(name, &object, false)?;
    Ok(())
}

pub fn switch_to_new_branch(repo: &GitRepository, name: &str) -> Result<()> {
    let head = repo.head()?.peel_to_commit()?;
    repo.branch(name, &head, false)?;
    switch_to_branch(repo, name)
}

pub fn switch_to_branch(repo: &GitRepository, name: &str) -> Result<()> {
    repo.set_head(&format!("refs/heads/{name}"))?;
    let mut checkout = CheckoutBuilder::new();
    checkout.force();
    repo.checkout_head(Some(&mut checkout))?;
    Ok(())
}
