use thiserror::Error;

/// Failures while turning a template placeholder into values.
///
/// These never reach callers of the dispatcher; the resolver degrades to
/// the literal template instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("malformed field path `{token}`: {reason}")]
    MalformedFieldPath { token: String, reason: String },
    #[error("field path `{path}` exceeds the traversal depth limit of {limit}")]
    DepthExceeded { path: String, limit: usize },
}

impl ResolveError {
    pub fn malformed(token: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedFieldPath {
            token: token.into(),
            reason: reason.into(),
        }
    }
}

/// Failure of a single outbound revalidation request.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request failed: {0}")]
    Request(String),
}
