//! TOML manifest describing a [`StaticDirectory`].
//!
//! ```toml
//! [[users]]
//! id = 1
//! name = "alice"
//!
//! [[repositories]]
//! id = 10
//! owner = "alice"
//! name = "widget"
//! path = "repos/alice/widget.git"   # relative to the manifest
//! fork_of = "bob/widget"            # optional
//! private = true                    # optional
//! collaborators = ["carol"]         # optional
//! disabled_units = ["issues"]       # optional
//! ```

use std::collections::HashMap;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use juxta_directory_api::{RepoId, RepositoryRecord, Unit, User, UserId};
use serde::Deserialize;
use tracing::debug;

use crate::memory::StaticDirectory;

/// Errors produced while loading a manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// The manifest file could not be read.
    #[error("failed to read manifest {path}: {source}")]
    Io {
        /// Manifest path.
        path: Utf8PathBuf,
        /// Source I/O error returned by the standard library.
        #[source]
        source: std::io::Error,
    },
    /// The manifest is not valid TOML or does not match the schema.
    #[error("failed to parse manifest: {source}")]
    Parse {
        /// Deserialization error.
        #[from]
        source: toml::de::Error,
    },
    /// A repository references a user that is not declared.
    #[error("repository {repository} references unknown user {user}")]
    UnknownUser {
        /// `owner/name` of the repository.
        repository: String,
        /// Missing login.
        user: String,
    },
    /// `fork_of` references a repository that is not declared.
    #[error("repository {repository} is a fork of unknown repository {parent}")]
    UnknownParent {
        /// `owner/name` of the fork.
        repository: String,
        /// Missing `owner/name`.
        parent: String,
    },
    /// Two entries share an id or a name.
    #[error("duplicate {kind} {key}")]
    Duplicate {
        /// `user` or `repository`.
        kind: &'static str,
        /// Conflicting key.
        key: String,
    },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    #[serde(default)]
    users: Vec<UserEntry>,
    #[serde(default)]
    repositories: Vec<RepositoryEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UserEntry {
    id: u64,
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RepositoryEntry {
    id: u64,
    owner: String,
    name: String,
    path: Utf8PathBuf,
    #[serde(default)]
    fork_of: Option<String>,
    #[serde(default)]
    private: bool,
    #[serde(default)]
    collaborators: Vec<String>,
    #[serde(default)]
    disabled_units: Vec<Unit>,
}

impl StaticDirectory {
    /// Load a directory from a manifest file.
    ///
    /// Relative repository paths are resolved against the manifest's directory.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError`] when the file cannot be read, parsed or is
    /// internally inconsistent.
    pub fn from_manifest_path(path: impl AsRef<Utf8Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_owned(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Utf8Path::new(""));
        let directory = Self::from_manifest_str(&contents, base)?;
        debug!(
            manifest = %path,
            repositories = directory.repository_count(),
            "loaded directory manifest"
        );
        Ok(directory)
    }

    /// Parse a manifest held in memory.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError`] when the text is not a valid manifest.
    pub fn from_manifest_str(contents: &str, base: &Utf8Path) -> Result<Self, ManifestError> {
        let manifest: Manifest = toml::from_str(contents)?;
        let mut builder = Self::builder();

        let mut users: HashMap<String, UserId> = HashMap::new();
        for entry in manifest.users {
            let key = entry.name.to_lowercase();
            if users.contains_key(&key) || users.values().any(|id| id.0 == entry.id) {
                return Err(ManifestError::Duplicate {
                    kind: "user",
                    key: entry.name,
                });
            }
            users.insert(key, UserId(entry.id));
            builder.insert_user(User::new(UserId(entry.id), entry.name));
        }

        let lookup_user = |repository: &str, login: &str| {
            users
                .get(&login.to_lowercase())
                .copied()
                .ok_or_else(|| ManifestError::UnknownUser {
                    repository: repository.to_owned(),
                    user: login.to_owned(),
                })
        };

        let mut by_name: HashMap<String, RepoId> = HashMap::new();
        for entry in &manifest.repositories {
            let full_name = format!("{}/{}", entry.owner, entry.name);
            let key = full_name.to_lowercase();
            if by_name.contains_key(&key) || by_name.values().any(|id| id.0 == entry.id) {
                return Err(ManifestError::Duplicate {
                    kind: "repository",
                    key: full_name,
                });
            }
            by_name.insert(key, RepoId(entry.id));
        }

        for entry in manifest.repositories {
            let full_name = format!("{}/{}", entry.owner, entry.name);
            let owner_id = lookup_user(&full_name, &entry.owner)?;
            let fork_of = match entry.fork_of {
                Some(parent) => Some(by_name.get(&parent.to_lowercase()).copied().ok_or(
                    ManifestError::UnknownParent {
                        repository: full_name.clone(),
                        parent,
                    },
                )?),
                None => None,
            };
            let path = if entry.path.is_absolute() {
                entry.path
            } else {
                base.join(entry.path)
            };

            let id = RepoId(entry.id);
            builder.insert_repository(RepositoryRecord {
                id,
                owner_id,
                owner_name: entry.owner,
                name: entry.name,
                path,
                fork_of,
                private: entry.private,
            });
            for login in &entry.collaborators {
                let collaborator = lookup_user(&full_name, login)?;
                builder.add_collaborator(id, collaborator);
            }
            for unit in entry.disabled_units {
                builder.disable_unit(id, unit);
            }
        }

        Ok(builder.build())
    }
}
