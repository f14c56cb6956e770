use thiserror::Error;

/// Failures surfaced by the document library and the query pipeline.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A request was malformed: blank name, missing owner, bad id.
    #[error("invalid request: {0}")]
    Validation(String),

    /// A document or field is larger than the library accepts.
    #[error("too large: {0}")]
    LimitExceeded(String),

    #[error("{0} does not exist")]
    NotFound(String),

    /// The document store could not be read or written.
    #[error("document store error: {0}")]
    Storage(String),

    /// The answer generator failed (network, quota, malformed response).
    #[error("answer generation failed: {0}")]
    Generation(String),

    /// The caller abandoned an in-flight query.
    #[error("query cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Other(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn limit(msg: impl Into<String>) -> Self {
        Self::LimitExceeded(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation(msg.into())
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Short machine-readable code used by the HTTP and MCP surfaces.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION",
            Self::LimitExceeded(_) => "LIMIT_EXCEEDED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Storage(_) => "STORAGE",
            Self::Generation(_) => "GENERATION_FAILED",
            Self::Cancelled => "CANCELLED",
            Self::Other(_) => "INTERNAL",
        }
    }
}
