use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query},
    response::{IntoResponse, Json, Response},
    Extension,
};
use serde_json::json;
use tracing::{info, warn};

use crate::api::rest::dto::{
    BannerResponse, CollectionResponse, ComprehensiveResponse, DayScheduleResponse, EmailQuery,
    KeyQuery, ProfileResponse, ScheduleParams, ScheduleQuery, ScheduleResponse, UidQuery,
    UserDataResponse, WeekScheduleResponse,
};
use crate::api::rest::error::{invalid_query, map_domain_error, missing_key, ProblemCtx};
use crate::contract::model::{Collection, JsonObject, UserKey};
use crate::domain::error::DomainError;
use crate::domain::service::Service;
use modkit::api::problem::ProblemResponse;

type Svc = Extension<Arc<Service>>;

fn parse<T>(query: Result<Query<T>, QueryRejection>, ctx: &ProblemCtx) -> Result<T, ProblemResponse> {
    query.map(|Query(q)| q).map_err(|rejection| {
        warn!(error = %rejection, path = %ctx.instance, "rejected query string");
        invalid_query(&rejection, ctx)
    })
}

fn require_key(q: &KeyQuery, ctx: &ProblemCtx) -> Result<UserKey, ProblemResponse> {
    q.key().ok_or_else(|| missing_key("`email` or `uid`", ctx))
}

fn require_uid(q: &UidQuery, ctx: &ProblemCtx) -> Result<String, ProblemResponse> {
    q.uid().ok_or_else(|| missing_key("`uid`", ctx))
}

fn require_email(email: Option<String>, ctx: &ProblemCtx) -> Result<String, ProblemResponse> {
    email.ok_or_else(|| missing_key("`email`", ctx))
}

async fn collection(
    svc: Arc<Service>,
    ctx: ProblemCtx,
    query: Result<Query<KeyQuery>, QueryRejection>,
    kind: Collection,
) -> Result<Json<CollectionResponse>, ProblemResponse> {
    let key = require_key(&parse(query, &ctx)?, &ctx)?;
    info!(field = kind.field(), key = ?key, "collection requested");

    match svc.collection(&key, kind).await {
        Ok(items) => Ok(Json(CollectionResponse { kind, items, key })),
        Err(e @ DomainError::StoreUnavailable { .. }) => {
            warn!(error = %e, "store unavailable, answering an empty collection");
            Ok(Json(CollectionResponse {
                kind,
                items: Vec::new(),
                key,
            }))
        }
        Err(e) => {
            warn!(error = %e, "collection lookup failed");
            Err(map_domain_error(&e, &ctx))
        }
    }
}

pub async fn tasks(
    Extension(svc): Svc,
    ctx: ProblemCtx,
    query: Result<Query<KeyQuery>, QueryRejection>,
) -> Result<Json<CollectionResponse>, ProblemResponse> {
    collection(svc, ctx, query, Collection::Tasks).await
}

pub async fn marks(
    Extension(svc): Svc,
    ctx: ProblemCtx,
    query: Result<Query<KeyQuery>, QueryRejection>,
) -> Result<Json<CollectionResponse>, ProblemResponse> {
    collection(svc, ctx, query, Collection::Marks).await
}

pub async fn reports(
    Extension(svc): Svc,
    ctx: ProblemCtx,
    query: Result<Query<KeyQuery>, QueryRejection>,
) -> Result<Json<CollectionResponse>, ProblemResponse> {
    collection(svc, ctx, query, Collection::Reports).await
}

pub async fn materials(
    Extension(svc): Svc,
    ctx: ProblemCtx,
    query: Result<Query<KeyQuery>, QueryRejection>,
) -> Result<Json<CollectionResponse>, ProblemResponse> {
    collection(svc, ctx, query, Collection::Materials).await
}

pub async fn profile(
    Extension(svc): Svc,
    ctx: ProblemCtx,
    query: Result<Query<KeyQuery>, QueryRejection>,
) -> Result<Json<ProfileResponse>, ProblemResponse> {
    let key = require_key(&parse(query, &ctx)?, &ctx)?;
    info!(key = ?key, "profile requested");

    match svc.profile(&key).await {
        Ok(profile) => Ok(Json(ProfileResponse::new(profile, key))),
        Err(e @ DomainError::StoreUnavailable { .. }) => {
            warn!(error = %e, "store unavailable, answering an empty profile");
            Ok(Json(ProfileResponse::new(JsonObject::new(), key)))
        }
        Err(e) => {
            warn!(error = %e, "profile lookup failed");
            Err(map_domain_error(&e, &ctx))
        }
    }
}

/// Week schedule by email, optionally for a specific week number
pub async fn schedule(
    Extension(svc): Svc,
    ctx: ProblemCtx,
    query: Result<Query<ScheduleQuery>, QueryRejection>,
) -> Result<Json<ScheduleResponse>, ProblemResponse> {
    let q = parse(query, &ctx)?;
    let email = require_email(q.email.filter(|e| !e.is_empty()), &ctx)?;
    info!(email = %email, week = ?q.week, "schedule requested");

    let schedule = svc.schedule_by_email(&email, q.week).await;
    Ok(Json(ScheduleResponse {
        success: true,
        schedule,
        user_email: email,
        params: ScheduleParams {
            week: q.week,
            group: q.group,
        },
    }))
}

async fn day(
    svc: Arc<Service>,
    ctx: ProblemCtx,
    query: Result<Query<UidQuery>, QueryRejection>,
    offset: i64,
) -> Result<Json<DayScheduleResponse>, ProblemResponse> {
    let uid = require_uid(&parse(query, &ctx)?, &ctx)?;
    info!(uid = %uid, offset, "day schedule requested");

    match svc.day_schedule(&uid, offset).await {
        Ok(schedule) => Ok(Json(DayScheduleResponse {
            success: true,
            schedule,
            user_id: uid,
        })),
        Err(e @ DomainError::StoreUnavailable { .. }) => {
            warn!(error = %e, "store unavailable, answering an empty day");
            Ok(Json(DayScheduleResponse {
                success: true,
                schedule: svc.empty_day(offset),
                user_id: uid,
            }))
        }
        Err(e) => {
            warn!(error = %e, "day schedule lookup failed");
            Err(map_domain_error(&e, &ctx))
        }
    }
}

pub async fn today(
    Extension(svc): Svc,
    ctx: ProblemCtx,
    query: Result<Query<UidQuery>, QueryRejection>,
) -> Result<Json<DayScheduleResponse>, ProblemResponse> {
    day(svc, ctx, query, 0).await
}

pub async fn tomorrow(
    Extension(svc): Svc,
    ctx: ProblemCtx,
    query: Result<Query<UidQuery>, QueryRejection>,
) -> Result<Json<DayScheduleResponse>, ProblemResponse> {
    day(svc, ctx, query, 1).await
}

pub async fn yesterday(
    Extension(svc): Svc,
    ctx: ProblemCtx,
    query: Result<Query<UidQuery>, QueryRejection>,
) -> Result<Json<DayScheduleResponse>, ProblemResponse> {
    day(svc, ctx, query, -1).await
}

pub async fn week(
    Extension(svc): Svc,
    ctx: ProblemCtx,
    query: Result<Query<UidQuery>, QueryRejection>,
) -> Result<Json<WeekScheduleResponse>, ProblemResponse> {
    let uid = require_uid(&parse(query, &ctx)?, &ctx)?;
    info!(uid = %uid, "week schedule requested");

    match svc.week_schedule(&uid).await {
        Ok(schedule) => Ok(Json(WeekScheduleResponse {
            success: true,
            schedule,
            user_id: uid,
        })),
        Err(e @ DomainError::StoreUnavailable { .. }) => {
            warn!(error = %e, "store unavailable, answering an empty week");
            Ok(Json(WeekScheduleResponse {
                success: true,
                schedule: json!({}),
                user_id: uid,
            }))
        }
        Err(e) => {
            warn!(error = %e, "week schedule lookup failed");
            Err(map_domain_error(&e, &ctx))
        }
    }
}

pub async fn comprehensive(
    Extension(svc): Svc,
    ctx: ProblemCtx,
    query: Result<Query<EmailQuery>, QueryRejection>,
) -> Result<Json<ComprehensiveResponse>, ProblemResponse> {
    let email = require_email(parse(query, &ctx)?.email(), &ctx)?;
    info!(email = %email, "comprehensive view requested");

    let data = svc.comprehensive(&email).await;
    Ok(Json(ComprehensiveResponse {
        success: true,
        data,
    }))
}

/// All data for a uid; a missing row or a store outage answers `{}`.
pub async fn user_data(
    Extension(svc): Svc,
    ctx: ProblemCtx,
    query: Result<Query<UidQuery>, QueryRejection>,
) -> Result<Response, ProblemResponse> {
    let uid = require_uid(&parse(query, &ctx)?, &ctx)?;
    info!(uid = %uid, "user data requested");

    match svc.user_data(&uid).await {
        Ok(Some(data)) => Ok(Json(UserDataResponse {
            success: true,
            data,
        })
        .into_response()),
        Ok(None) => Ok(Json(json!({})).into_response()),
        Err(e @ DomainError::StoreUnavailable { .. }) => {
            warn!(error = %e, "store unavailable, answering no data");
            Ok(Json(json!({})).into_response())
        }
        Err(e) => {
            warn!(error = %e, "user data lookup failed");
            Err(map_domain_error(&e, &ctx))
        }
    }
}

pub async fn banner() -> Json<BannerResponse> {
    Json(BannerResponse {
        message: "Student portal API is running".to_string(),
        database: "user_data table".to_string(),
        endpoints: [
            "/tasks?email=student@example.com",
            "/profile?email=student@example.com",
            "/schedule?email=student@example.com&week=44",
            "/marks?uid=<user_id>",
            "/reports?email=student@example.com",
            "/materials?email=student@example.com",
            "/schedule/today?uid=<user_id>",
            "/schedule/week?uid=<user_id>",
            "/users/comprehensive?email=student@example.com",
            "/users/data?uid=<user_id>",
        ]
        .into_iter()
        .map(str::to_owned)
        .collect(),
    })
}
