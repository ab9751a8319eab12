//! Request-level outcome of a failed operation.
//!
//! Callers serving users see only three kinds of failure. A repository the
//! actor may not read and one that does not exist collapse into the same
//! [`RequestError::NotFound`] value.

use crate::Error;

/// Failure as reported to whoever issued the request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    /// The request itself is invalid.
    #[error("malformed request: {message}")]
    Malformed {
        /// Description of the problem.
        message: String,
    },
    /// A user, repository, ref or file does not exist (or is hidden).
    #[error("not found: {message}")]
    NotFound {
        /// Description of what was missing.
        message: String,
    },
    /// A collaborator failed; the request may succeed later.
    #[error("service unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },
}

impl RequestError {
    /// Process exit status used by the CLI.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Unavailable { .. } => 1,
            Self::Malformed { .. } => 2,
            Self::NotFound { .. } => 3,
        }
    }
}

impl From<Error> for RequestError {
    fn from(err: Error) -> Self {
        let message = err.to_string();
        match err {
            Error::MalformedRequest { .. } | Error::Config { .. } => Self::Malformed { message },
            Error::RefNotFound { .. }
            | Error::RepoNotFound { .. }
            | Error::UserNotFound { .. }
            | Error::PermissionDenied { .. }
            | Error::BlobNotFound { .. } => Self::NotFound { message },
            Error::Read { .. }
            | Error::Git { .. }
            | Error::Directory { .. }
            | Error::NotARepository { .. }
            | Error::Io { .. } => Self::Unavailable { message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use juxta_api::CompareSide;

    #[test]
    fn denial_matches_absence() {
        let denied = RequestError::from(Error::PermissionDenied {
            owner: "alice".into(),
            name: "secret".into(),
        });
        let missing = RequestError::from(Error::RepoNotFound {
            owner: "alice".into(),
            name: "secret".into(),
        });
        assert_eq!(denied, missing);
        assert_eq!(denied.exit_code(), 3);
    }

    #[test]
    fn classifies_each_kind() {
        let malformed = RequestError::from(Error::MalformedRequest {
            fragment: "main".into(),
            reason: "missing range separator",
        });
        assert!(matches!(malformed, RequestError::Malformed { .. }));
        assert_eq!(malformed.exit_code(), 2);

        let missing_ref = RequestError::from(Error::RefNotFound {
            side: CompareSide::Head,
            reference: "nope".into(),
        });
        assert_eq!(
            missing_ref,
            RequestError::NotFound {
                message: "head ref not found: nope".into()
            }
        );

        let git = RequestError::from(Error::from(git2::Error::from_str("boom")));
        assert!(matches!(git, RequestError::Unavailable { .. }));
        assert_eq!(git.exit_code(), 1);
    }
}
