use thiserror::Error;

/// Errors that are safe to expose to other modules
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StudentPortalError {
    #[error("User not found: {user_id}")]
    NotFound { user_id: String },

    #[error("Store unavailable")]
    Unavailable,
}

impl StudentPortalError {
    pub fn not_found(user_id: impl Into<String>) -> Self {
        Self::NotFound {
            user_id: user_id.into(),
        }
    }
}

impl From<crate::domain::error::DomainError> for StudentPortalError {
    fn from(domain_error: crate::domain::error::DomainError) -> Self {
        use crate::domain::error::DomainError::*;
        match domain_error {
            UserNotFound { user_id } => Self::not_found(user_id),
            StoreUnavailable { .. } => Self::Unavailable,
        }
    }
}
