use std::collections::{BTreeMap, HashMap, HashSet};

use camino::Utf8PathBuf;
use juxta_directory_api::{
    Directory, DirectoryError, DirectoryResult, Permission, RepoId, RepositoryRecord, Unit, User,
    UserId,
};

#[derive(Debug, Clone)]
struct RepositoryEntry {
    record: RepositoryRecord,
    collaborators: HashSet<UserId>,
    disabled_units: HashSet<Unit>,
}

/// In-memory directory of users and repositories.
///
/// Access rules: public repositories are readable by everyone, private ones by
/// their owner and collaborators. Disabled units are unreadable for all.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    users: BTreeMap<UserId, User>,
    users_by_name: HashMap<String, UserId>,
    repositories: BTreeMap<RepoId, RepositoryEntry>,
}

impl StaticDirectory {
    /// Start building a directory programmatically.
    #[must_use]
    pub fn builder() -> StaticDirectoryBuilder {
        StaticDirectoryBuilder::default()
    }

    /// Number of registered repositories.
    #[must_use]
    pub fn repository_count(&self) -> usize {
        self.repositories.len()
    }

    /// All repositories, ordered by id.
    pub fn repositories(&self) -> impl Iterator<Item = &RepositoryRecord> + '_ {
        self.repositories.values().map(|entry| &entry.record)
    }

    fn entry(&self, id: RepoId) -> Option<&RepositoryEntry> {
        self.repositories.get(&id)
    }
}

impl Directory for StaticDirectory {
    fn user_by_name(&self, name: &str) -> DirectoryResult<User> {
        self.users_by_name
            .get(&name.to_lowercase())
            .and_then(|id| self.users.get(id))
            .cloned()
            .ok_or_else(|| DirectoryError::UserNotFound {
                name: name.to_owned(),
            })
    }

    fn user_by_id(&self, id: UserId) -> DirectoryResult<User> {
        self.users
            .get(&id)
            .cloned()
            .ok_or_else(|| DirectoryError::UserNotFound {
                name: id.to_string(),
            })
    }

    fn repository_by_owner_and_name(
        &self,
        owner: &str,
        name: &str,
    ) -> DirectoryResult<RepositoryRecord> {
        self.repositories
            .values()
            .map(|entry| &entry.record)
            .find(|record| {
                record.owner_name.eq_ignore_ascii_case(owner) && record.name.eq_ignore_ascii_case(name)
            })
            .cloned()
            .ok_or_else(|| DirectoryError::RepoNotFound {
                name: format!("{owner}/{name}"),
            })
    }

    fn repository_by_id(&self, id: RepoId) -> DirectoryResult<RepositoryRecord> {
        self.entry(id)
            .map(|entry| entry.record.clone())
            .ok_or_else(|| DirectoryError::RepoNotFound {
                name: id.to_string(),
            })
    }

    fn forked_repository(
        &self,
        user: UserId,
        repo: RepoId,
    ) -> DirectoryResult<Option<RepositoryRecord>> {
        Ok(self
            .repositories
            .values()
            .map(|entry| &entry.record)
            .find(|record| record.owner_id == user && record.fork_of == Some(repo))
            .cloned())
    }

    fn permission(
        &self,
        repo: &RepositoryRecord,
        actor: Option<&User>,
    ) -> DirectoryResult<Permission> {
        let entry = self
            .entry(repo.id)
            .ok_or_else(|| DirectoryError::RepoNotFound {
                name: repo.full_name().to_string(),
            })?;

        let has_access = !entry.record.private
            || actor.is_some_and(|user| {
                user.id == entry.record.owner_id || entry.collaborators.contains(&user.id)
            });
        if !has_access {
            return Ok(Permission::NONE);
        }

        Ok(Permission::from_units(
            Unit::ALL
                .into_iter()
                .filter(|unit| !entry.disabled_units.contains(unit)),
        ))
    }
}

/// Incremental constructor for [`StaticDirectory`].
#[derive(Debug, Default)]
pub struct StaticDirectoryBuilder {
    directory: StaticDirectory,
    next_user: u64,
    next_repo: u64,
}

impl StaticDirectoryBuilder {
    /// Register a user with the next free id.
    pub fn user(&mut self, name: impl Into<String>) -> UserId {
        self.next_user += 1;
        let id = UserId(self.next_user);
        self.insert_user(User::new(id, name));
        id
    }

    /// Register a user with an explicit id.
    pub fn insert_user(&mut self, user: User) {
        self.next_user = self.next_user.max(user.id.0);
        self.directory
            .users_by_name
            .insert(user.name.to_lowercase(), user.id);
        self.directory.users.insert(user.id, user);
    }

    /// Register a repository owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::UserNotFound`] when `owner` was not
    /// registered first.
    pub fn repository(
        &mut self,
        owner: UserId,
        name: impl Into<String>,
        path: impl Into<Utf8PathBuf>,
    ) -> DirectoryResult<RepoId> {
        self.add_repository(owner, name.into(), path.into(), None)
    }

    /// Register a fork of `parent` owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::UserNotFound`] when `owner` was not
    /// registered first.
    pub fn fork(
        &mut self,
        owner: UserId,
        parent: RepoId,
        name: impl Into<String>,
        path: impl Into<Utf8PathBuf>,
    ) -> DirectoryResult<RepoId> {
        self.add_repository(owner, name.into(), path.into(), Some(parent))
    }

    /// Register a fully specified repository record.
    pub fn insert_repository(&mut self, record: RepositoryRecord) {
        self.next_repo = self.next_repo.max(record.id.0);
        self.directory.repositories.insert(
            record.id,
            RepositoryEntry {
                record,
                collaborators: HashSet::new(),
                disabled_units: HashSet::new(),
            },
        );
    }

    /// Mark a repository private.
    pub fn make_private(&mut self, repo: RepoId) -> &mut Self {
        if let Some(entry) = self.directory.repositories.get_mut(&repo) {
            entry.record.private = true;
        }
        self
    }

    /// Grant `user` the same access as the owner of `repo`.
    pub fn add_collaborator(&mut self, repo: RepoId, user: UserId) -> &mut Self {
        if let Some(entry) = self.directory.repositories.get_mut(&repo) {
            entry.collaborators.insert(user);
        }
        self
    }

    /// Turn off a unit of `repo` for everyone.
    pub fn disable_unit(&mut self, repo: RepoId, unit: Unit) -> &mut Self {
        if let Some(entry) = self.directory.repositories.get_mut(&repo) {
            entry.disabled_units.insert(unit);
        }
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> StaticDirectory {
        self.directory
    }

    fn add_repository(
        &mut self,
        owner: UserId,
        name: String,
        path: Utf8PathBuf,
        fork_of: Option<RepoId>,
    ) -> DirectoryResult<RepoId> {
        let owner_name = self
            .directory
            .users
            .get(&owner)
            .map(|user| user.name.clone())
            .ok_or_else(|| DirectoryError::UserNotFound {
                name: owner.to_string(),
            })?;
        self.next_repo += 1;
        let id = RepoId(self.next_repo);
        self.insert_repository(RepositoryRecord {
            id,
            owner_id: owner,
            owner_name,
            name,
            path,
            fork_of,
            private: false,
        });
        Ok(id)
    }
}
