use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::contract::model::{
    Collection, DaySchedule, EmailAggregate, JsonObject, UserData, UserKey,
};
use crate::domain::aggregate;
use crate::domain::clock::Clock;
use crate::domain::error::DomainError;
use crate::domain::record::UserRecord;
use crate::domain::repo::{RecordStore, StoreError};
use crate::domain::resolve;
use crate::domain::schedule;

/// Domain service: resolves students and builds their views.
/// Depends only on the store port and a clock, not on infra types.
#[derive(Clone)]
pub struct Service {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    config: ServiceConfig,
}

/// Configuration for the domain service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Upper bound for any single store call.
    pub store_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_secs(10),
        }
    }
}

impl Service {
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>, config: ServiceConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        let limit = self.config.store_timeout;
        tokio::time::timeout(limit, call)
            .await
            .map_err(|_| StoreError::Timeout {
                ms: limit.as_millis() as u64,
            })?
    }

    /// Every row whose profile carries `email`. Store failures degrade to
    /// an empty result.
    #[instrument(name = "student_portal.service.find_all_by_email", skip(self))]
    pub async fn find_all_by_email(&self, email: &str) -> Vec<UserRecord> {
        match self.bounded(self.store.scan()).await {
            Ok(rows) => {
                let scanned = rows.len();
                let found = resolve::filter_by_email(rows, email);
                debug!(scanned, matched = found.len(), "email resolution done");
                found
            }
            Err(e) => {
                warn!(error = %e, "table scan failed, treating as no match");
                Vec::new()
            }
        }
    }

    /// The row stored under `user_id`. A store failure is
    /// `StoreUnavailable`, never an absent row.
    #[instrument(name = "student_portal.service.get_record_by_id", skip(self))]
    pub async fn get_record_by_id(&self, user_id: &str) -> Result<Option<UserRecord>, DomainError> {
        match self.bounded(self.store.find_by_user_id(user_id)).await {
            Ok(found) => {
                debug!(found = found.is_some(), "point lookup done");
                Ok(found)
            }
            Err(e) => {
                warn!(error = %e, "point lookup failed");
                Err(e.into())
            }
        }
    }

    async fn require_record(&self, user_id: &str) -> Result<UserRecord, DomainError> {
        self.get_record_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::user_not_found(user_id))
    }

    /// Items of one collection. The email path merges and dedups across
    /// rows; the uid path returns the row's items as stored.
    #[instrument(
        name = "student_portal.service.collection",
        skip(self),
        fields(field = kind.field())
    )]
    pub async fn collection(
        &self,
        key: &UserKey,
        kind: Collection,
    ) -> Result<Vec<Value>, DomainError> {
        match key {
            UserKey::Email(email) => {
                let rows = self.find_all_by_email(email).await;
                Ok(aggregate::collect(&rows, kind.field()))
            }
            UserKey::Uid(uid) => {
                let row = self.require_record(uid).await?;
                Ok(row.field(kind.field()).items().to_vec())
            }
        }
    }

    #[instrument(name = "student_portal.service.profile", skip(self))]
    pub async fn profile(&self, key: &UserKey) -> Result<JsonObject, DomainError> {
        match key {
            UserKey::Email(email) => {
                let rows = self.find_all_by_email(email).await;
                Ok(aggregate::select_best_profile(&rows))
            }
            UserKey::Uid(uid) => {
                let row = self.require_record(uid).await?;
                Ok(aggregate::select_best_profile(std::slice::from_ref(&row)))
            }
        }
    }

    #[instrument(name = "student_portal.service.schedule_by_email", skip(self))]
    pub async fn schedule_by_email(&self, email: &str, week: Option<i64>) -> JsonObject {
        let rows = self.find_all_by_email(email).await;
        aggregate::select_best_schedule(&rows, week)
    }

    /// Day view for `today + offset` of the row stored under `user_id`.
    #[instrument(name = "student_portal.service.day_schedule", skip(self))]
    pub async fn day_schedule(&self, user_id: &str, offset: i64) -> Result<DaySchedule, DomainError> {
        let row = self.require_record(user_id).await?;
        let day = schedule::project_for_record(&row, offset, self.clock.today());
        debug!(date = %day.date, classes = day.schedule.len(), source = ?day.source, "day projected");
        Ok(day)
    }

    /// Day view with no classes, for answering when the store is down.
    pub fn empty_day(&self, offset: i64) -> DaySchedule {
        schedule::base_day(self.clock.today(), offset)
    }

    /// The stored week schedule, `{}` when the row has none.
    #[instrument(name = "student_portal.service.week_schedule", skip(self))]
    pub async fn week_schedule(&self, user_id: &str) -> Result<Value, DomainError> {
        let row = self.require_record(user_id).await?;
        Ok(stored_week(&row))
    }

    /// Everything known about `email`, from a single scan.
    #[instrument(name = "student_portal.service.comprehensive", skip(self))]
    pub async fn comprehensive(&self, email: &str) -> EmailAggregate {
        let rows = self.find_all_by_email(email).await;
        if rows.is_empty() {
            info!("no rows for email");
            return EmailAggregate::empty(email);
        }

        EmailAggregate {
            email: email.to_string(),
            total_records: rows.len(),
            profile: aggregate::select_best_profile(&rows),
            tasks: aggregate::collect(&rows, Collection::Tasks.field()),
            schedule: aggregate::select_best_schedule(&rows, None),
            marks: aggregate::collect(&rows, Collection::Marks.field()),
            reports: aggregate::collect(&rows, Collection::Reports.field()),
            materials: aggregate::collect(&rows, Collection::Materials.field()),
            user_ids: rows.iter().map(UserRecord::user_id).collect(),
            last_updated: aggregate::last_updated(&rows),
        }
    }

    /// All data stored under `user_id`; `None` when there is no such row.
    #[instrument(name = "student_portal.service.user_data", skip(self))]
    pub async fn user_data(&self, user_id: &str) -> Result<Option<UserData>, DomainError> {
        let Some(row) = self.get_record_by_id(user_id).await? else {
            return Ok(None);
        };
        let today = self.clock.today();
        let items = |kind: Collection| row.field(kind.field()).items().to_vec();

        Ok(Some(UserData {
            user_id: user_id.to_string(),
            profile: aggregate::select_best_profile(std::slice::from_ref(&row)),
            tasks: items(Collection::Tasks),
            marks: items(Collection::Marks),
            reports: items(Collection::Reports),
            materials: items(Collection::Materials),
            extra_classes: items(Collection::ExtraClasses),
            schedule: stored_week(&row),
            today_schedule: schedule::project_for_record(&row, 0, today),
            tomorrow_schedule: schedule::project_for_record(&row, 1, today),
            yesterday_schedule: schedule::project_for_record(&row, -1, today),
            updated_at: row.get("updated_at").cloned().unwrap_or(Value::Null),
        }))
    }

    /// Store reachability, for health checks. Not degraded.
    #[instrument(name = "student_portal.service.ping", skip(self))]
    pub async fn ping(&self) -> Result<(), DomainError> {
        self.bounded(self.store.ping()).await.map_err(Into::into)
    }
}

fn stored_week(row: &UserRecord) -> Value {
    row.get("week_schedule")
        .filter(|v| v.is_object())
        .cloned()
        .unwrap_or_else(|| Value::Object(JsonObject::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::FixedClock;
    use crate::infra::storage::InMemoryRecordStore;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use serde_json::json;

    fn service_with(rows: Vec<Value>) -> Service {
        let store = InMemoryRecordStore::from_values(rows);
        Service::new(
            Arc::new(store),
            Arc::new(FixedClock(NaiveDate::from_ymd_opt(2025, 11, 10).unwrap())),
            ServiceConfig::default(),
        )
    }

    fn two_row_student() -> Vec<Value> {
        vec![
            json!({"user_id": "u1", "profile": {"email": "a@x.com"}, "tasks": [{"id": 1}]}),
            json!({"user_id": "u2", "profile": {"contacts": {"email": "a@x.com"}},
                   "tasks": [{"id": 1}, {"id": 2}]}),
            json!({"user_id": "u3", "profile": {"email": "b@x.com"}, "tasks": [{"id": 9}]}),
        ]
    }

    #[tokio::test]
    async fn email_rows_are_merged() {
        let svc = service_with(two_row_student());

        assert_eq!(svc.find_all_by_email("a@x.com").await.len(), 2);
        let tasks = svc
            .collection(&UserKey::Email("a@x.com".into()), Collection::Tasks)
            .await
            .unwrap();
        assert_eq!(tasks, vec![json!({"id": 1}), json!({"id": 2})]);
    }

    #[tokio::test]
    async fn unknown_email_is_empty_not_an_error() {
        let svc = service_with(two_row_student());
        let key = UserKey::Email("nobody@x.com".into());

        for kind in [
            Collection::Tasks,
            Collection::Marks,
            Collection::Reports,
            Collection::Materials,
        ] {
            assert!(svc.collection(&key, kind).await.unwrap().is_empty());
        }
        assert!(svc.profile(&key).await.unwrap().is_empty());
        assert!(svc.schedule_by_email("nobody@x.com", Some(44)).await.is_empty());

        let agg = svc.comprehensive("nobody@x.com").await;
        assert_eq!(agg, EmailAggregate::empty("nobody@x.com"));
    }

    #[tokio::test]
    async fn unknown_uid_is_not_found() {
        let svc = service_with(two_row_student());
        let err = svc
            .collection(&UserKey::Uid("missing".into()), Collection::Marks)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::UserNotFound { .. }));
        assert!(svc.day_schedule("missing", 0).await.is_err());
        assert!(svc.user_data("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn comprehensive_without_timestamps_has_no_last_updated() {
        let svc = service_with(two_row_student());
        let agg = svc.comprehensive("a@x.com").await;
        assert_eq!(agg.total_records, 2);
        assert_eq!(agg.user_ids, vec![json!("u1"), json!("u2")]);
        assert_eq!(agg.last_updated, None);
        assert_eq!(agg.profile.get("user_id"), Some(&json!("u1")));
    }

    #[tokio::test]
    async fn user_data_projects_three_days() {
        let svc = service_with(vec![json!({
            "user_id": "u1",
            "extra_classes": {"subject": "Chess"},
            "week_schedule": {"days": [
                {"date": "09.11", "classes": []},
                {"date": "10.11", "classes": [{"subject": "Math"}]},
                {"date": "11.11", "classes": [{"subject": "Art"}]}
            ]},
            "updated_at": "2025-11-09T20:00:00"
        })]);

        let data = svc.user_data("u1").await.unwrap().unwrap();
        assert_eq!(data.today_schedule.schedule[0].subject, "Math");
        assert_eq!(data.tomorrow_schedule.schedule[0].subject, "Art");
        assert!(!data.yesterday_schedule.has_schedule);
        assert_eq!(data.extra_classes, vec![json!({"subject": "Chess"})]);
        assert_eq!(data.updated_at, json!("2025-11-09T20:00:00"));
        assert_eq!(data.profile.get("user_id"), Some(&json!("u1")));
    }

    struct FailingStore;

    #[async_trait]
    impl RecordStore for FailingStore {
        async fn scan(&self) -> Result<Vec<UserRecord>, StoreError> {
            Err(StoreError::Transport("connection refused".into()))
        }
        async fn find_by_user_id(&self, _: &str) -> Result<Option<UserRecord>, StoreError> {
            Err(StoreError::Transport("connection refused".into()))
        }
        async fn ping(&self) -> Result<(), StoreError> {
            Err(StoreError::Transport("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn store_failures_degrade_by_email_and_surface_by_uid() {
        let svc = Service::new(
            Arc::new(FailingStore),
            Arc::new(FixedClock(NaiveDate::from_ymd_opt(2025, 11, 10).unwrap())),
            ServiceConfig::default(),
        );
        assert!(svc.find_all_by_email("a@x.com").await.is_empty());
        assert!(svc.comprehensive("a@x.com").await.profile.is_empty());

        let uid = UserKey::Uid("u1".into());
        assert!(matches!(
            svc.collection(&uid, Collection::Marks).await,
            Err(DomainError::StoreUnavailable { .. })
        ));
        assert!(matches!(
            svc.profile(&uid).await,
            Err(DomainError::StoreUnavailable { .. })
        ));
        assert!(matches!(
            svc.day_schedule("u1", 0).await,
            Err(DomainError::StoreUnavailable { .. })
        ));
        assert!(matches!(
            svc.week_schedule("u1").await,
            Err(DomainError::StoreUnavailable { .. })
        ));
        assert!(matches!(
            svc.user_data("u1").await,
            Err(DomainError::StoreUnavailable { .. })
        ));
        assert!(matches!(
            svc.ping().await,
            Err(DomainError::StoreUnavailable { .. })
        ));
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn resolution_and_degradation_are_logged() {
        let svc = service_with(two_row_student());
        svc.find_all_by_email("a@x.com").await;
        assert!(logs_contain("row matched email"));

        let failing = Service::new(
            Arc::new(FailingStore),
            Arc::new(FixedClock(NaiveDate::from_ymd_opt(2025, 11, 10).unwrap())),
            ServiceConfig::default(),
        );
        failing.find_all_by_email("a@x.com").await;
        assert!(logs_contain("table scan failed"));
        assert!(logs_contain("connection refused"));
    }

    struct SlowStore;

    #[async_trait]
    impl RecordStore for SlowStore {
        async fn scan(&self) -> Result<Vec<UserRecord>, StoreError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Vec::new())
        }
        async fn find_by_user_id(&self, _: &str) -> Result<Option<UserRecord>, StoreError> {
            Ok(None)
        }
        async fn ping(&self) -> Result<(), StoreError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn slow_store_calls_time_out() {
        let svc = Service::new(
            Arc::new(SlowStore),
            Arc::new(FixedClock(NaiveDate::from_ymd_opt(2025, 11, 10).unwrap())),
            ServiceConfig {
                store_timeout: Duration::from_millis(20),
            },
        );
        let err = svc.ping().await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
        assert!(svc.find_all_by_email("a@x.com").await.is_empty());
    }
}
