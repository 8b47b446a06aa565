use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::contract::{
    client::StudentPortalApi,
    error::StudentPortalError,
    model::{Collection, DaySchedule, EmailAggregate, JsonObject, UserData, UserKey},
};
use crate::domain::service::Service;

/// Local implementation of the StudentPortalApi trait that delegates to the domain service
pub struct StudentPortalLocalClient {
    service: Arc<Service>,
}

impl StudentPortalLocalClient {
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl StudentPortalApi for StudentPortalLocalClient {
    async fn collection(
        &self,
        key: &UserKey,
        kind: Collection,
    ) -> Result<Vec<Value>, StudentPortalError> {
        self.service.collection(key, kind).await.map_err(Into::into)
    }

    async fn profile(&self, key: &UserKey) -> Result<JsonObject, StudentPortalError> {
        self.service.profile(key).await.map_err(Into::into)
    }

    async fn schedule_by_email(
        &self,
        email: &str,
        week: Option<i64>,
    ) -> Result<JsonObject, StudentPortalError> {
        Ok(self.service.schedule_by_email(email, week).await)
    }

    async fn day_schedule(
        &self,
        user_id: &str,
        offset: i64,
    ) -> Result<DaySchedule, StudentPortalError> {
        self.service
            .day_schedule(user_id, offset)
            .await
            .map_err(Into::into)
    }

    async fn comprehensive(&self, email: &str) -> Result<EmailAggregate, StudentPortalError> {
        Ok(self.service.comprehensive(email).await)
    }

    async fn user_data(&self, user_id: &str) -> Result<UserData, StudentPortalError> {
        self.service
            .user_data(user_id)
            .await?
            .ok_or_else(|| StudentPortalError::not_found(user_id))
    }
}
