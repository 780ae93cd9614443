use thiserror::Error;

/// Failure returned by store actions.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No user is signed in")]
    NotSignedIn,

    #[error("No session found in local storage")]
    NoSession,

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Old password is incorrect")]
    IncorrectPassword,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad Request: {0}")]
    Validation(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Local storage error: {0}")]
    Storage(String),

    /// Database or network fault from the document store.
    #[error(transparent)]
    Remote(#[from] anyhow::Error),
}

impl StoreError {
    /// Stable code for callers that branch on the kind of failure.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::NotSignedIn => "NOT_SIGNED_IN",
            StoreError::NoSession => "NO_SESSION",
            StoreError::UserNotFound(_) => "USER_NOT_FOUND",
            StoreError::InvalidCredentials => "INVALID_CREDENTIALS",
            StoreError::IncorrectPassword => "INCORRECT_PASSWORD",
            StoreError::Conflict(_) => "CONFLICT",
            StoreError::Validation(_) => "VALIDATION_ERROR",
            StoreError::Hashing(_) => "HASHING_ERROR",
            StoreError::Storage(_) => "STORAGE_ERROR",
            StoreError::Remote(_) => "REMOTE_ERROR",
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
