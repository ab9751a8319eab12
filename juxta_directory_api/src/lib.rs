//! Directory collaborator used by the compare flow.
//!
//! A directory answers who a user is, which repositories exist, how they are
//! related through forks and what an actor may read. Hosting services back it
//! with their database; `juxta_directory` ships a file-backed implementation.

mod types;

pub use types::{
    DirectoryError, DirectoryResult, Permission, RepoId, RepositoryRecord, Unit, User, UserId,
};

/// Lookup interface over users, repositories and access rules.
pub trait Directory: Send + Sync {
    /// Find a user by login name.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::UserNotFound`] when no such user exists.
    fn user_by_name(&self, name: &str) -> DirectoryResult<User>;

    /// Find a user by id.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::UserNotFound`] when no such user exists.
    fn user_by_id(&self, id: UserId) -> DirectoryResult<User>;

    /// Find a repository by owner login and repository name.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::RepoNotFound`] when no such repository exists.
    fn repository_by_owner_and_name(&self, owner: &str, name: &str)
        -> DirectoryResult<RepositoryRecord>;

    /// Find a repository by id.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::RepoNotFound`] when no such repository exists.
    fn repository_by_id(&self, id: RepoId) -> DirectoryResult<RepositoryRecord>;

    /// The fork of `repo` owned by `user`, if there is one.
    ///
    /// # Errors
    ///
    /// Implementors should surface backend failures only; absence is `Ok(None)`.
    fn forked_repository(&self, user: UserId, repo: RepoId)
        -> DirectoryResult<Option<RepositoryRecord>>;

    /// Access `actor` holds on `repo`; `None` is the anonymous visitor.
    ///
    /// # Errors
    ///
    /// Implementors should surface backend failures only.
    fn permission(&self, repo: &RepositoryRecord, actor: Option<&User>)
        -> DirectoryResult<Permission>;
}
