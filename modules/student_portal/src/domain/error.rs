use thiserror::Error;

use crate::domain::repo::StoreError;

/// Domain-specific errors using thiserror
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("User not found: {user_id}")]
    UserNotFound { user_id: String },

    #[error("Store unavailable: {message}")]
    StoreUnavailable { message: String },
}

impl DomainError {
    pub fn user_not_found(user_id: impl Into<String>) -> Self {
        Self::UserNotFound {
            user_id: user_id.into(),
        }
    }

    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
        }
    }
}

impl From<StoreError> for DomainError {
    fn from(e: StoreError) -> Self {
        Self::store_unavailable(e.to_string())
    }
}
