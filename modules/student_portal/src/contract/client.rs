use async_trait::async_trait;
use serde_json::Value;

use crate::contract::{
    error::StudentPortalError,
    model::{Collection, DaySchedule, EmailAggregate, JsonObject, UserData, UserKey},
};

/// Public API trait for the student_portal module that other modules can use
#[async_trait]
pub trait StudentPortalApi: Send + Sync {
    /// Items of one collection for an email (merged across rows) or a uid.
    async fn collection(
        &self,
        key: &UserKey,
        kind: Collection,
    ) -> Result<Vec<Value>, StudentPortalError>;

    /// Most complete profile for the key.
    async fn profile(&self, key: &UserKey) -> Result<JsonObject, StudentPortalError>;

    /// Most complete schedule across an email's rows, optionally for a week.
    async fn schedule_by_email(
        &self,
        email: &str,
        week: Option<i64>,
    ) -> Result<JsonObject, StudentPortalError>;

    /// Day view `offset` days from today for a uid.
    async fn day_schedule(&self, user_id: &str, offset: i64)
        -> Result<DaySchedule, StudentPortalError>;

    /// Aggregate view of every row matching an email.
    async fn comprehensive(&self, email: &str) -> Result<EmailAggregate, StudentPortalError>;

    /// Everything stored under a uid.
    async fn user_data(&self, user_id: &str) -> Result<UserData, StudentPortalError>;
}
