use std::fmt;

use camino::Utf8PathBuf;
use juxta_api::RepoName;
use serde::{Deserialize, Serialize};

/// Stable identifier of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

/// Stable identifier of a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepoId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user#{}", self.0)
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "repo#{}", self.0)
    }
}

/// A user account as seen by the compare flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Identifier.
    pub id: UserId,
    /// Login name.
    pub name: String,
}

impl User {
    /// Construct a user.
    #[must_use]
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// A hosted repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    /// Identifier.
    pub id: RepoId,
    /// Owning user.
    pub owner_id: UserId,
    /// Login of the owning user.
    pub owner_name: String,
    /// Repository name, unique per owner.
    pub name: String,
    /// On-disk location of the git directory.
    pub path: Utf8PathBuf,
    /// Repository this one was forked from.
    #[serde(default)]
    pub fork_of: Option<RepoId>,
    /// Hidden from users without explicit access.
    #[serde(default)]
    pub private: bool,
}

impl RepositoryRecord {
    /// Whether the repository was created as a fork.
    #[must_use]
    pub const fn is_fork(&self) -> bool {
        self.fork_of.is_some()
    }

    /// Owner-qualified name.
    #[must_use]
    pub fn full_name(&self) -> RepoName {
        RepoName::new(&self.owner_name, &self.name)
    }
}

/// Feature areas of a repository that carry their own access rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    /// Source code, refs and history.
    Code,
    /// Issue tracker.
    Issues,
    /// Pull requests.
    PullRequests,
}

impl Unit {
    /// Every unit.
    pub const ALL: [Self; 3] = [Self::Code, Self::Issues, Self::PullRequests];
}

/// Read access an actor holds on a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Permission {
    /// May read code.
    #[serde(default)]
    pub code: bool,
    /// May read issues.
    #[serde(default)]
    pub issues: bool,
    /// May read pull requests.
    #[serde(default)]
    pub pull_requests: bool,
}

impl Permission {
    /// No access at all.
    pub const NONE: Self = Self {
        code: false,
        issues: false,
        pull_requests: false,
    };

    /// Read access to every unit.
    pub const READ_ALL: Self = Self {
        code: true,
        issues: true,
        pull_requests: true,
    };

    /// Read access to exactly the given units.
    #[must_use]
    pub fn from_units(units: impl IntoIterator<Item = Unit>) -> Self {
        units.into_iter().fold(Self::NONE, |mut permission, unit| {
            match unit {
                Unit::Code => permission.code = true,
                Unit::Issues => permission.issues = true,
                Unit::PullRequests => permission.pull_requests = true,
            }
            permission
        })
    }

    /// Whether the unit is readable.
    #[must_use]
    pub const fn can_read(&self, unit: Unit) -> bool {
        match unit {
            Unit::Code => self.code,
            Unit::Issues => self.issues,
            Unit::PullRequests => self.pull_requests,
        }
    }

    /// Pull-request access when `is_pull`, issue access otherwise.
    #[must_use]
    pub const fn can_read_issues_or_pulls(&self, is_pull: bool) -> bool {
        if is_pull {
            self.pull_requests
        } else {
            self.issues
        }
    }
}

/// Errors surfaced by directory implementations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    /// No user with the given name or id.
    #[error("user does not exist: {name}")]
    UserNotFound {
        /// Name or id that was looked up.
        name: String,
    },
    /// No repository with the given owner and name or id.
    #[error("repository does not exist: {name}")]
    RepoNotFound {
        /// `owner/name` or id that was looked up.
        name: String,
    },
    /// The backing store failed.
    #[error("directory backend failure: {message}")]
    Backend {
        /// Human-readable error message.
        message: String,
    },
}

impl DirectoryError {
    /// Helper to construct a backend failure from any displayable message.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// Convenience result alias for directory operations.
pub type DirectoryResult<T> = std::result::Result<T, DirectoryError>;
