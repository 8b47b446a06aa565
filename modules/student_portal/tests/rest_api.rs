//! REST layer exercised through the real routes over the fixture rows.
//!
//! "Today" is pinned to 2025-11-10 (a Monday) so day projections are stable.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use serde_json::{json, Value};
use tower::ServiceExt;

use student_portal::config::StudentPortalConfig;
use student_portal::domain::clock::FixedClock;
use student_portal::domain::record::UserRecord;
use student_portal::domain::repo::{RecordStore, StoreError};
use student_portal::infra::storage::InMemoryRecordStore;
use student_portal::StudentPortal;

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures/user_data.json")
}

fn app() -> Router {
    let store = InMemoryRecordStore::from_fixture(&fixture_path()).expect("fixture loads");
    let clock = FixedClock(NaiveDate::from_ymd_opt(2025, 11, 10).unwrap());
    let portal = StudentPortal::new(
        Arc::new(store),
        Arc::new(clock),
        &StudentPortalConfig::default(),
    );
    portal.register_rest(Router::new())
}

async fn get(uri: &str) -> (StatusCode, Option<String>, Value) {
    get_with(Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

async fn get_with(req: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let response = app().oneshot(req).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, content_type, json)
}

#[tokio::test]
async fn tasks_by_email_are_merged_across_rows() {
    let (status, _, body) = get("/tasks?email=ivanov@example.com").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["user_email"], "ivanov@example.com");
    assert_eq!(body["tasks_count"], 3);
    let ids: Vec<_> = body["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].clone())
        .collect();
    assert_eq!(ids, vec![json!(1), json!(2), json!(3)]);
}

#[tokio::test]
async fn single_item_and_null_fields_are_normalized() {
    let (_, _, reports) = get("/reports?email=ivanov@example.com").await;
    assert_eq!(reports["reports_count"], 1);
    assert_eq!(reports["reports"][0]["id"], 11);

    let (_, _, materials) = get("/materials?email=ivanov@example.com").await;
    assert_eq!(materials["materials_count"], 1);
}

#[tokio::test]
async fn unknown_email_is_an_empty_success() {
    let (status, _, body) = get("/marks?email=nobody@example.com").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["marks"], json!([]));
    assert_eq!(body["marks_count"], 0);

    let (status, _, body) = get("/profile?email=nobody@example.com").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["profile"], json!({}));
}

#[tokio::test]
async fn uid_lookup_uses_a_single_row() {
    let (status, _, body) = get("/tasks?uid=1002").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], "1002");
    assert_eq!(body["tasks_count"], 2);
    assert!(body.get("user_email").is_none());
}

#[tokio::test]
async fn unknown_uid_is_a_problem_404() {
    let req = Request::builder()
        .uri("/marks?uid=9999")
        .header("x-request-id", "req-404")
        .body(Body::empty())
        .unwrap();
    let (status, content_type, body) = get_with(req).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(content_type.as_deref(), Some("application/problem+json"));
    assert_eq!(body["code"], "USER_NOT_FOUND");
    assert_eq!(body["instance"], "/marks");
    assert_eq!(body["request_id"], "req-404");
}

#[tokio::test]
async fn missing_key_is_a_problem_400() {
    for uri in [
        "/tasks",
        "/profile?email=",
        "/schedule",
        "/schedule/today",
        "/users/comprehensive",
        "/users/data?email=ivanov@example.com",
    ] {
        let (status, content_type, body) = get(uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(content_type.as_deref(), Some("application/problem+json"));
        assert_eq!(body["code"], "MISSING_QUERY_KEY", "{uri}");
    }
}

#[tokio::test]
async fn malformed_week_is_a_problem_400() {
    let (status, _, body) = get("/schedule?email=ivanov@example.com&week=forty").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_QUERY");
}

#[tokio::test]
async fn profile_by_email_picks_the_most_complete() {
    let (_, _, body) = get("/profile?email=ivanov@example.com").await;
    let profile = &body["profile"];
    assert_eq!(profile["faculty"], "Институт информационных технологий");
    // Filled in from the first matching row
    assert_eq!(profile["user_id"], "1001");
}

#[tokio::test]
async fn schedule_by_email_with_week() {
    let (_, _, plain) = get("/schedule?email=ivanov@example.com").await;
    assert_eq!(plain["schedule"]["group"], "4231");
    assert!(plain["schedule"].get("week").is_none());
    assert_eq!(plain["params"], json!({"week": null, "group": null}));

    let (_, _, weekly) = get("/schedule?email=ivanov@example.com&week=46&group=4231").await;
    assert_eq!(weekly["schedule"]["week"], 46);
    assert_eq!(weekly["params"], json!({"week": 46, "group": "4231"}));
}

#[tokio::test]
async fn today_prefers_stored_today_schedule() {
    let (_, _, body) = get("/schedule/today?uid=1002").await;
    let day = &body["schedule"];
    assert_eq!(day["source"], "today_schedule");
    assert_eq!(day["schedule"][0]["subject"], "Философия");
    assert_eq!(day["schedule"][0]["pairNumber"], "2");
    assert_eq!(day["date"], "2025-11-10");
}

#[tokio::test]
async fn day_views_project_the_week_schedule() {
    let (_, _, today) = get("/schedule/today?uid=1001").await;
    let day = &today["schedule"];
    assert_eq!(day["source"], "week_schedule");
    assert_eq!(day["date_dd_mm"], "10.11");
    assert_eq!(day["day_name"], "Пн");
    assert_eq!(day["day_of_week"], 0);
    assert_eq!(day["has_schedule"], true);
    assert_eq!(day["fullDate"], "10 ноября");
    assert_eq!(day["schedule"][0]["teacher"], "Петров П.П.");

    let (_, _, tomorrow) = get("/schedule/tomorrow?uid=1001").await;
    assert_eq!(tomorrow["schedule"]["schedule"][0]["subject"], "Компьютерные сети");
    assert_eq!(tomorrow["schedule"]["schedule"][0]["teacherInfo"], "");

    let (_, _, yesterday) = get("/schedule/yesterday?uid=1001").await;
    assert_eq!(yesterday["schedule"]["date"], "2025-11-09");
    assert_eq!(yesterday["schedule"]["has_schedule"], false);
    assert_eq!(yesterday["schedule"]["schedule"], json!([]));
}

#[tokio::test]
async fn week_returns_stored_schedule_or_empty() {
    let (_, _, body) = get("/schedule/week?uid=1001").await;
    assert_eq!(body["schedule"]["days"].as_array().unwrap().len(), 2);

    let (status, _, body) = get("/schedule/week?uid=1002").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["schedule"], json!({}));
}

#[tokio::test]
async fn comprehensive_view_for_email() {
    let (status, _, body) = get("/users/comprehensive?email=ivanov@example.com").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["total_records"], 2);
    assert_eq!(body["user_ids"], json!(["1001", "1002"]));
    assert_eq!(body["last_updated"], "2025-11-09T18:40:02.100+00:00");
    assert_eq!(body["tasks"].as_array().unwrap().len(), 3);

    let (_, _, empty) = get("/users/comprehensive?email=nobody@example.com").await;
    assert_eq!(empty["total_records"], 0);
    assert_eq!(empty["last_updated"], Value::Null);
}

#[tokio::test]
async fn user_data_for_uid() {
    let (_, _, body) = get("/users/data?uid=1002").await;
    assert_eq!(body["success"], true);
    assert_eq!(body["user_id"], "1002");
    assert_eq!(body["extra_classes"][0]["subject"], "Английский язык");
    assert_eq!(body["today_schedule"]["source"], "today_schedule");
    assert_eq!(body["tomorrow_schedule"]["source"], "none");

    let (status, _, missing) = get("/users/data?uid=9999").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(missing, json!({}));
}

#[tokio::test]
async fn banner_lists_endpoints() {
    let (status, _, body) = get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["endpoints"].as_array().unwrap().len() >= 6);
}

struct DownStore;

#[async_trait]
impl RecordStore for DownStore {
    async fn scan(&self) -> Result<Vec<UserRecord>, StoreError> {
        Err(StoreError::Transport("down".into()))
    }
    async fn find_by_user_id(&self, _: &str) -> Result<Option<UserRecord>, StoreError> {
        Err(StoreError::Transport("down".into()))
    }
    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::Transport("down".into()))
    }
}

#[tokio::test]
async fn store_outage_on_uid_routes_answers_empty_views() {
    let app = StudentPortal::new(
        Arc::new(DownStore),
        Arc::new(FixedClock(NaiveDate::from_ymd_opt(2025, 11, 10).unwrap())),
        &StudentPortalConfig::default(),
    )
    .register_rest(Router::new());

    let call = |uri: &'static str| {
        let app = app.clone();
        async move {
            let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
            let response = app.oneshot(req).await.unwrap();
            let status = response.status();
            let body = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            (status, serde_json::from_slice::<Value>(&body).unwrap())
        }
    };

    let (status, body) = call("/marks?uid=1001").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["marks"], json!([]));
    assert_eq!(body["marks_count"], 0);
    assert_eq!(body["user_id"], "1001");

    let (status, body) = call("/profile?uid=1001").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["profile"], json!({}));

    let (status, body) = call("/schedule/today?uid=1001").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["schedule"]["date"], "2025-11-10");
    assert_eq!(body["schedule"]["has_schedule"], false);
    assert_eq!(body["schedule"]["schedule"], json!([]));

    let (status, body) = call("/schedule/week?uid=1001").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["schedule"], json!({}));

    let (status, body) = call("/users/data?uid=1001").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));

    let (status, body) = call("/marks?email=ivanov@example.com").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["marks_count"], 0);
}
