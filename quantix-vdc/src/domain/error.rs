//! Error types shared by every service and repository.

use thiserror::Error;

/// Errors that can occur in control plane operations.
///
/// The variants form the closed set of error kinds surfaced to API clients;
/// services never return raw backend error strings without wrapping.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Request failed validation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A unique constraint (hostname, name) was violated.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The entity is in a state that does not permit the operation.
    #[error("failed precondition: {0}")]
    FailedPrecondition(String),

    /// An optimistic-concurrency race was lost, or orchestration could not
    /// reach a usable end state (e.g. no healthy storage host at create).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A node daemon could not be reached (transport error or timeout).
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// The per-node in-flight limit was hit.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Unexpected failure.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias for control plane operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Stable Connect-RPC error code for this kind.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidArgument(_) => "invalid_argument",
            Error::NotFound(_) => "not_found",
            Error::AlreadyExists(_) => "already_exists",
            Error::FailedPrecondition(_) => "failed_precondition",
            Error::Conflict(_) => "aborted",
            Error::Unavailable(_) => "unavailable",
            Error::ResourceExhausted(_) => "resource_exhausted",
            Error::Internal(_) => "internal",
        }
    }

    /// HTTP status the Connect envelope is served with.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::InvalidArgument(_) => 400,
            Error::NotFound(_) => 404,
            Error::AlreadyExists(_) => 409,
            Error::FailedPrecondition(_) => 412,
            Error::Conflict(_) => 409,
            Error::Unavailable(_) => 503,
            Error::ResourceExhausted(_) => 429,
            Error::Internal(_) => 500,
        }
    }

    /// Whether a retry with backoff can reasonably succeed.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Error::Unavailable(_) | Error::Conflict(_))
    }

    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        Error::NotFound(format!("{} {}", entity, id))
    }

    pub fn already_exists(entity: &str, key: impl std::fmt::Display) -> Self {
        Error::AlreadyExists(format!("{} {}", entity, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(Error::InvalidArgument("x".into()).code(), "invalid_argument");
        assert_eq!(Error::Conflict("x".into()).code(), "aborted");
        assert_eq!(Error::Unavailable("x".into()).http_status(), 503);
        assert_eq!(Error::ResourceExhausted("x".into()).http_status(), 429);
    }

    #[test]
    fn test_retriable_kinds() {
        assert!(Error::Unavailable("gone".into()).is_retriable());
        assert!(Error::Conflict("lost race".into()).is_retriable());
        assert!(!Error::InvalidArgument("bad".into()).is_retriable());
        assert!(!Error::NotFound("vm".into()).is_retriable());
    }
}
