//! Parsing of compare fragments.
//!
//! A fragment has the shape `base...[owner[/repo]:]head` (merge-base mode) or
//! `base..[owner[/repo]:]head` (direct mode).

use crate::{Error, Result};

/// Separator of merge-base comparisons.
pub const MERGE_BASE_SEPARATOR: &str = "...";
/// Separator of direct comparisons.
pub const DIRECT_SEPARATOR: &str = "..";

/// Where the head ref lives, as written in the fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadSpec {
    /// No owner given; head is the base repository.
    Implicit,
    /// `owner:ref`; the repository is found through fork relations.
    Owner(String),
    /// `owner/repo:ref`.
    Repository {
        /// Owner login.
        owner: String,
        /// Repository name.
        name: String,
    },
}

/// A parsed compare fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompareRequest {
    /// Base ref exactly as written.
    pub base_ref: String,
    /// Head repository selector.
    pub head: HeadSpec,
    /// Head ref exactly as written.
    pub head_ref: String,
    /// `..` was used instead of `...`.
    pub direct: bool,
}

impl CompareRequest {
    /// Parse a compare fragment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedRequest`] when the fragment has no range
    /// separator, an empty side, or a head selector with too many `:` or `/`.
    pub fn parse(fragment: &str) -> Result<Self> {
        let malformed = |reason| Error::MalformedRequest {
            fragment: fragment.to_owned(),
            reason,
        };

        let (base, head, direct) = if let Some((base, head)) =
            fragment.split_once(MERGE_BASE_SEPARATOR)
        {
            (base, head, false)
        } else if let Some((base, head)) = fragment.split_once(DIRECT_SEPARATOR) {
            (base, head, true)
        } else {
            return Err(malformed("missing range separator"));
        };
        if base.is_empty() {
            return Err(malformed("empty base ref"));
        }

        let mut parts = head.split(':');
        let (selector, head_ref) = match (parts.next(), parts.next(), parts.next()) {
            (Some(head_ref), None, None) => (None, head_ref),
            (Some(selector), Some(head_ref), None) => (Some(selector), head_ref),
            _ => return Err(malformed("too many ':' in head")),
        };
        if head_ref.is_empty() {
            return Err(malformed("empty head ref"));
        }

        let head = match selector {
            None => HeadSpec::Implicit,
            Some("") => return Err(malformed("empty head owner")),
            Some(selector) => match selector.split_once('/') {
                None => HeadSpec::Owner(selector.to_owned()),
                Some((owner, name)) => {
                    if owner.is_empty() || name.is_empty() || name.contains('/') {
                        return Err(malformed("head repository must be owner/name"));
                    }
                    HeadSpec::Repository {
                        owner: owner.to_owned(),
                        name: name.to_owned(),
                    }
                }
            },
        };

        Ok(Self {
            base_ref: base.to_owned(),
            head,
            head_ref: head_ref.to_owned(),
            direct,
        })
    }

    /// Separator matching the comparison mode.
    #[must_use]
    pub const fn separator(&self) -> &'static str {
        if self.direct {
            DIRECT_SEPARATOR
        } else {
            MERGE_BASE_SEPARATOR
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_follows_separator() {
        let merge = CompareRequest::parse("main...feature").expect("parse");
        assert!(!merge.direct);
        assert_eq!(merge.base_ref, "main");
        assert_eq!(merge.head_ref, "feature");
        assert_eq!(merge.head, HeadSpec::Implicit);
        assert_eq!(merge.separator(), "...");

        let direct = CompareRequest::parse("v1.0..v1.1").expect("parse");
        assert!(direct.direct);
        assert_eq!(direct.base_ref, "v1.0");
        assert_eq!(direct.head_ref, "v1.1");
    }

    #[test]
    fn first_separator_wins() {
        let request = CompareRequest::parse("a...b...c").expect("parse");
        assert_eq!(request.base_ref, "a");
        assert_eq!(request.head_ref, "b...c");
    }

    #[test]
    fn head_selectors() {
        let owner = CompareRequest::parse("main...bob:feature").expect("parse");
        assert_eq!(owner.head, HeadSpec::Owner("bob".into()));
        assert_eq!(owner.head_ref, "feature");

        let repo = CompareRequest::parse("main..bob/widget:feature").expect("parse");
        assert_eq!(
            repo.head,
            HeadSpec::Repository {
                owner: "bob".into(),
                name: "widget".into()
            }
        );
        assert!(repo.direct);
    }

    #[test]
    fn rejects_malformed_fragments() {
        for fragment in [
            "main",
            "...feature",
            "main...",
            "main...a:b:c",
            "main...:feature",
            "main...bob:",
            "main...a/b/c:feature",
            "main.../widget:feature",
        ] {
            let err = CompareRequest::parse(fragment).expect_err(fragment);
            assert!(
                matches!(err, Error::MalformedRequest { .. }),
                "{fragment}: {err}"
            );
        }
    }
}
