use async_trait::async_trait;
use thiserror::Error;

use crate::domain::record::UserRecord;

/// Failures reported by a [`RecordStore`]. The service decides whether to
/// degrade or surface them.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Transport(String),

    #[error("store request timed out after {ms} ms")]
    Timeout { ms: u64 },

    #[error("store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("store returned malformed rows: {0}")]
    Decode(String),

    #[error("invalid store configuration: {0}")]
    Config(String),
}

/// Port for the domain layer: read access to the user data table.
/// Object-safe and async-friendly via `async_trait`.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Every row of the table, in store order.
    async fn scan(&self) -> Result<Vec<UserRecord>, StoreError>;

    /// First row whose `user_id` equals `user_id`.
    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Cheap reachability probe.
    async fn ping(&self) -> Result<(), StoreError>;
}
