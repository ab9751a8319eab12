//! Directory access for the compare flow.

use std::sync::Arc;

pub use juxta_directory_api::{
    Directory, DirectoryError, DirectoryResult, Permission, RepoId, RepositoryRecord, Unit, User,
    UserId,
};
use tracing::{debug, trace};

use crate::{Error, Result};

/// High-level façade over a [`Directory`] speaking the crate's error type.
#[derive(Clone)]
pub struct DirectoryService {
    directory: Arc<dyn Directory>,
}

impl DirectoryService {
    /// Create a service backed by the provided directory.
    #[must_use]
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self { directory }
    }

    /// Access the underlying directory.
    #[must_use]
    pub fn directory(&self) -> Arc<dyn Directory> {
        Arc::clone(&self.directory)
    }

    /// Look up a user by login.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UserNotFound`] or [`Error::Directory`].
    pub fn user_by_name(&self, name: &str) -> Result<User> {
        self.directory.user_by_name(name).map_err(convert)
    }

    /// Look up a user by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UserNotFound`] or [`Error::Directory`].
    pub fn user_by_id(&self, id: UserId) -> Result<User> {
        self.directory.user_by_id(id).map_err(convert)
    }

    /// Look up a repository by owner and name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RepoNotFound`] or [`Error::Directory`].
    pub fn repository(&self, owner: &str, name: &str) -> Result<RepositoryRecord> {
        self.directory
            .repository_by_owner_and_name(owner, name)
            .map_err(|err| match err {
                DirectoryError::RepoNotFound { .. } => Error::RepoNotFound {
                    owner: owner.to_owned(),
                    name: name.to_owned(),
                },
                other => convert(other),
            })
    }

    /// Look up a repository by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RepoNotFound`] or [`Error::Directory`].
    pub fn repository_by_id(&self, id: RepoId) -> Result<RepositoryRecord> {
        self.directory.repository_by_id(id).map_err(convert)
    }

    /// Root repository of a fork; `None` when `repo` is not a fork or its
    /// root no longer exists.
    ///
    /// # Errors
    ///
    /// Propagates directory backend failures.
    pub fn root_repository(&self, repo: &RepositoryRecord) -> Result<Option<RepositoryRecord>> {
        let Some(root) = repo.fork_of else {
            return Ok(None);
        };
        match self.directory.repository_by_id(root) {
            Ok(record) => Ok(Some(record)),
            Err(DirectoryError::RepoNotFound { .. }) => {
                debug!(repo = %repo.full_name(), root = %root, "fork root is missing");
                Ok(None)
            }
            Err(err) => Err(convert(err)),
        }
    }

    /// Fork of `repo` owned by `user`.
    ///
    /// # Errors
    ///
    /// Propagates directory backend failures.
    pub fn forked_repository(
        &self,
        user: UserId,
        repo: RepoId,
    ) -> Result<Option<RepositoryRecord>> {
        self.directory.forked_repository(user, repo).map_err(convert)
    }

    /// Access `actor` holds on `repo`.
    ///
    /// # Errors
    ///
    /// Propagates directory backend failures.
    pub fn permission(&self, repo: &RepositoryRecord, actor: Option<&User>) -> Result<Permission> {
        self.directory.permission(repo, actor).map_err(convert)
    }

    /// Whether `actor` may read the code of `repo`.
    ///
    /// # Errors
    ///
    /// Propagates directory backend failures.
    pub fn can_read_code(&self, repo: &RepositoryRecord, actor: Option<&User>) -> Result<bool> {
        Ok(self.permission(repo, actor)?.can_read(Unit::Code))
    }

    /// Fail with [`Error::PermissionDenied`] unless `actor` may read the code of `repo`.
    /// Returns the full permission on success.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PermissionDenied`] or directory backend failures.
    pub fn ensure_code_readable(
        &self,
        repo: &RepositoryRecord,
        actor: Option<&User>,
    ) -> Result<Permission> {
        let permission = self.permission(repo, actor)?;
        if permission.can_read(Unit::Code) {
            return Ok(permission);
        }
        trace!(
            repo = %repo.full_name(),
            actor = actor.map_or("anonymous", |user| user.name.as_str()),
            "code unit not readable"
        );
        Err(Error::PermissionDenied {
            owner: repo.owner_name.clone(),
            name: repo.name.clone(),
        })
    }
}

fn convert(err: DirectoryError) -> Error {
    match err {
        DirectoryError::UserNotFound { name } => Error::UserNotFound { name },
        DirectoryError::RepoNotFound { name } => {
            let (owner, name) = match name.split_once('/') {
                Some((owner, name)) => (owner.to_owned(), name.to_owned()),
                None => (String::new(), name),
            };
            Error::RepoNotFound { owner, name }
        }
        source @ DirectoryError::Backend { .. } => Error::Directory { source },
    }
}

impl std::fmt::Debug for DirectoryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryService").finish_non_exhaustive()
    }
}
