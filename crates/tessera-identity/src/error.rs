use std::fmt;

use tessera_domain::KeyParseError;

/// Errors raised by the identity stores, the context and the document backends.
///
/// Expected business failures (a stale concurrency stamp during `update`) are
/// reported through [`IdentityResult`] instead.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("value cannot be empty: {0}")]
    InvalidArgument(&'static str),
    #[error("cannot access a disposed object: {0}")]
    ObjectDisposed(&'static str),
    #[error("operation was cancelled")]
    Cancelled,
    #[error("{0}")]
    NotUnique(String),
    #[error("{0}")]
    InvalidOperation(String),
    #[error(transparent)]
    Format(#[from] KeyParseError),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("document {collection}/{id} was modified or deleted by another writer")]
    ConcurrencyConflict { collection: String, id: String },
    #[error("document {collection}/{id} already exists")]
    DuplicateKey { collection: String, id: String },
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl IdentityError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::ObjectDisposed(_) => "OBJECT_DISPOSED",
            Self::Cancelled => "CANCELLED",
            Self::NotUnique(_) => "NOT_UNIQUE",
            Self::InvalidOperation(_) => "INVALID_OPERATION",
            Self::Format(_) => "FORMAT",
            Self::Configuration(_) => "CONFIGURATION",
            Self::ConcurrencyConflict { .. } => "CONCURRENCY_CONFLICT",
            Self::DuplicateKey { .. } => "DUPLICATE_KEY",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

/// A non-exceptional failure reported to the identity framework.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityFailure {
    pub code: String,
    pub description: String,
}

impl IdentityFailure {
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
        }
    }

    pub fn concurrency_failure() -> Self {
        Self::new(
            "ConcurrencyFailure",
            "Optimistic concurrency failure, object has been modified.",
        )
    }
}

/// Outcome of a create, update or delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityResult {
    Success,
    Failed(Vec<IdentityFailure>),
}

impl IdentityResult {
    pub fn failed(errors: impl IntoIterator<Item = IdentityFailure>) -> Self {
        Self::Failed(errors.into_iter().collect())
    }

    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn errors(&self) -> &[IdentityFailure] {
        match self {
            Self::Success => &[],
            Self::Failed(errors) => errors,
        }
    }
}

impl fmt::Display for IdentityResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("Succeeded"),
            Self::Failed(errors) => {
                let codes: Vec<&str> = errors.iter().map(|e| e.code.as_str()).collect();
                write!(f, "Failed : {}", codes.join(","))
            }
        }
    }
}
