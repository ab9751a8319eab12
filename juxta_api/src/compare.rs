use std::fmt;

use serde::{Deserialize, Serialize};

use crate::repository::Revision;

/// Prefix of fully qualified branch references.
pub const BRANCH_PREFIX: &str = "refs/heads/";
/// Prefix of fully qualified tag references.
pub const TAG_PREFIX: &str = "refs/tags/";

/// What a user-supplied ref string turned out to name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    /// A commit id (full, or abbreviated and expanded).
    Commit,
    /// A branch under `refs/heads/`.
    Branch,
    /// A tag under `refs/tags/`.
    Tag,
}

/// A ref string after classification against a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRef {
    /// Short name as the user wrote it, or the full commit id.
    pub name: String,
    /// Classification of the name.
    pub kind: RefKind,
}

impl ResolvedRef {
    /// Construct a resolved ref.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: RefKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Name to hand to git: prefixed for branches and tags, bare for commits.
    #[must_use]
    pub fn full_name(&self) -> String {
        match self.kind {
            RefKind::Branch => format!("{BRANCH_PREFIX}{}", self.name),
            RefKind::Tag => format!("{TAG_PREFIX}{}", self.name),
            RefKind::Commit => self.name.clone(),
        }
    }

    /// Whether the ref names a branch.
    #[must_use]
    pub fn is_branch(&self) -> bool {
        self.kind == RefKind::Branch
    }
}

/// Which side of a comparison something belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareSide {
    /// The side being merged into.
    Base,
    /// The side carrying the changes.
    Head,
}

impl fmt::Display for CompareSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base => f.write_str("base"),
            Self::Head => f.write_str("head"),
        }
    }
}

/// How a comparison is offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Presentation {
    /// Full pull-request workflow: both sides are branches and the actor may open one.
    PullRequest,
    /// Read-only diff.
    Diff,
}

/// Lookup used to find the head repository when the URL names only an owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForkStrategy {
    /// The base is a fork and the head owner owns its root repository.
    RootRepository,
    /// The acting user's own fork of the base, when the head owner is that user.
    ActorFork,
    /// A fork of the base owned by the head owner.
    HeadOwnerFork,
    /// A fork of the base's root repository owned by the head owner.
    RootFork,
}

impl ForkStrategy {
    /// Order in which strategies are tried; the first hit wins.
    pub const ORDER: [Self; 4] = [
        Self::RootRepository,
        Self::ActorFork,
        Self::HeadOwnerFork,
        Self::RootFork,
    ];
}

/// How the head repository was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadSource {
    /// Head and base are the same repository.
    Base,
    /// The URL named the head repository explicitly.
    Explicit,
    /// Found through a fork lookup.
    Fork(ForkStrategy),
    /// Nothing matched; the base repository stands in and the comparison is diff-only.
    Fallback,
}

/// Owner-qualified repository name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoName {
    /// Owner login.
    pub owner: String,
    /// Repository name.
    pub name: String,
}

impl RepoName {
    /// Construct a repository name.
    #[must_use]
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepoName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Commit range computed for a comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareInfo {
    /// Merge base of base and head (the base commit itself for unrelated histories).
    pub merge_base: String,
    /// Commit the base ref resolved to.
    pub base_commit_id: String,
    /// Commit the head ref resolved to.
    pub head_commit_id: String,
    /// Commits reachable from head but not from the range start, newest first.
    #[serde(default)]
    pub commits: Vec<Revision>,
    /// Number of files touched by the range.
    #[serde(default)]
    pub files_changed: usize,
}

/// Alternative head repository offered next to the resolved one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRepository {
    /// Repository the refs belong to.
    pub repository: RepoName,
    /// Why the repository is offered.
    pub relation: CandidateRelation,
    /// Branch names.
    #[serde(default)]
    pub branches: Vec<String>,
    /// Tag names.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Relationship between a candidate repository and the base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateRelation {
    /// The repository the base was forked from.
    RootRepository,
    /// The acting user's own fork of the base.
    OwnFork,
}

/// Serializable outcome of resolving a compare fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareSummary {
    /// Base repository.
    pub base_repository: RepoName,
    /// Head repository.
    pub head_repository: RepoName,
    /// Login of the head owner as written in the URL (or the base owner).
    pub head_user: String,
    /// Classified base ref.
    pub base_ref: ResolvedRef,
    /// Classified head ref.
    pub head_ref: ResolvedRef,
    /// Head and base are the same repository.
    pub is_same_repo: bool,
    /// `..` comparison without merge-base adjustment.
    pub direct: bool,
    /// Pull request or plain diff.
    pub presentation: Presentation,
    /// How the head repository was found.
    pub head_source: HeadSource,
    /// Commit range.
    pub info: CompareInfo,
    /// Head already contained in base; nothing to diff.
    pub nothing_to_compare: bool,
    /// Alternative head repositories.
    #[serde(default)]
    pub candidates: Vec<CandidateRepository>,
}

/// Prefilled title and body for opening a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestDraft {
    /// Title, at most 255 bytes.
    pub title: String,
    /// Body text; empty when there is nothing to prefill.
    #[serde(default)]
    pub body: String,
}
