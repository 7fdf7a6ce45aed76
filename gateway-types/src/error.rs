//! Error types for the payment gateway.

/// Domain-level errors (business rule violations).
///
/// A closed set of kinds; callers branch on the variant, never on the message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("account not found")]
    AccountNotFound,

    #[error("api key already exists")]
    DuplicatedApiKey,

    #[error("invoice not found")]
    InvoiceNotFound,

    #[error("unauthorized access")]
    UnauthorizedAccess,

    #[error("invalid amount")]
    InvalidAmount,

    #[error("invalid status")]
    InvalidStatus,

    #[error("invalid credit card: {0}")]
    InvalidCard(String),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Repository-level errors (data access failures).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),
}

impl RepoError {
    /// Returns the domain error kind carried by this error, if any.
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            RepoError::Domain(e) => Some(e),
            _ => None,
        }
    }
}

/// Application-level errors (for HTTP responses).
///
/// Maps cleanly to HTTP status codes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        let msg = err.to_string();
        match err {
            DomainError::InvalidAmount
            | DomainError::InvalidCard(_)
            | DomainError::Validation(_) => AppError::BadRequest(msg),
            DomainError::AccountNotFound => AppError::Unauthorized(msg),
            DomainError::UnauthorizedAccess => AppError::Forbidden(msg),
            DomainError::InvoiceNotFound => AppError::NotFound(msg),
            DomainError::DuplicatedApiKey | DomainError::InvalidStatus => AppError::Conflict(msg),
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Domain(e) => e.into(),
            RepoError::NotFound => AppError::NotFound("Resource not found".into()),
            RepoError::Database(e) => AppError::Internal(e),
            RepoError::Conflict(e) => AppError::Conflict(e),
        }
    }
}
