use serde::{Deserialize, Serialize};

/// Number of hex characters shown for abbreviated commit ids.
pub const SHORT_ID_LEN: usize = 10;

/// Identity of a revision that juxta can reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    /// Full object identifier (e.g., git SHA).
    pub oid: String,
    /// Optional human-friendly reference such as a branch name.
    #[serde(default)]
    pub reference: Option<String>,
    /// Optional summary line describing the revision.
    #[serde(default)]
    pub summary: Option<String>,
    /// Full commit message, summary included.
    #[serde(default)]
    pub message: Option<String>,
    /// Author information when available.
    #[serde(default)]
    pub author: Option<Signature>,
    /// Committer information when available.
    #[serde(default)]
    pub committer: Option<Signature>,
    /// Unix timestamp (seconds) associated with the revision.
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl Revision {
    /// A revision known only by its object id.
    #[must_use]
    pub fn from_oid(oid: impl Into<String>) -> Self {
        Self {
            oid: oid.into(),
            reference: None,
            summary: None,
            message: None,
            author: None,
            committer: None,
            timestamp: None,
        }
    }

    /// Abbreviated object id.
    #[must_use]
    pub fn short_id(&self) -> &str {
        short_id(&self.oid)
    }
}

/// Abbreviate an object id to [`SHORT_ID_LEN`] characters.
#[must_use]
pub fn short_id(oid: &str) -> &str {
    oid.get(..SHORT_ID_LEN).unwrap_or(oid)
}

/// Structured author/committer identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Display name for the individual.
    pub name: String,
    /// Optional email address.
    #[serde(default)]
    pub email: Option<String>,
}

/// The pair of revisions used for diff operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionRange {
    /// Base revision. Omitted when diffing against an empty tree.
    #[serde(default)]
    pub base: Option<Revision>,
    /// Head revision (the state being reviewed).
    pub head: Revision,
}
