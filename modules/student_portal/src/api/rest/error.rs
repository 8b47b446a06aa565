use std::convert::Infallible;

use axum::extract::{rejection::QueryRejection, FromRequestParts};
use axum::http::{request::Parts, StatusCode};
use modkit::api::problem::{Problem, ProblemResponse};

use crate::domain::error::DomainError;

/// Request facts every problem response carries.
#[derive(Debug, Clone, Default)]
pub struct ProblemCtx {
    pub instance: String,
    pub request_id: Option<String>,
}

impl<S> FromRequestParts<S> for ProblemCtx
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self {
            instance: parts.uri.path().to_string(),
            request_id: parts
                .headers
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned),
        })
    }
}

/// Helper to create a ProblemResponse with less boilerplate
pub fn from_parts(
    status: StatusCode,
    code: &str,
    title: &str,
    detail: impl Into<String>,
    ctx: &ProblemCtx,
) -> ProblemResponse {
    let mut problem = Problem::new(status, title, detail)
        .with_code(code)
        .with_instance(ctx.instance.clone());
    if let Some(id) = &ctx.request_id {
        problem = problem.with_request_id(id.clone());
    }
    ProblemResponse(problem)
}

/// Neither accepted lookup key was supplied.
pub fn missing_key(keys: &str, ctx: &ProblemCtx) -> ProblemResponse {
    from_parts(
        StatusCode::BAD_REQUEST,
        "MISSING_QUERY_KEY",
        "Missing query parameter",
        format!("query parameter {keys} is required"),
        ctx,
    )
}

/// The query string could not be parsed (e.g. a non-numeric `week`).
pub fn invalid_query(rejection: &QueryRejection, ctx: &ProblemCtx) -> ProblemResponse {
    from_parts(
        StatusCode::BAD_REQUEST,
        "INVALID_QUERY",
        "Invalid query string",
        rejection.body_text(),
        ctx,
    )
}

/// Map domain error to RFC9457 ProblemResponse
pub fn map_domain_error(e: &DomainError, ctx: &ProblemCtx) -> ProblemResponse {
    match e {
        DomainError::UserNotFound { user_id } => from_parts(
            StatusCode::NOT_FOUND,
            "USER_NOT_FOUND",
            "User not found",
            format!("no data stored for user_id '{user_id}'"),
            ctx,
        ),
        DomainError::StoreUnavailable { .. } => {
            // Details stay in the log
            tracing::error!(error = ?e, "store unavailable");
            from_parts(
                StatusCode::SERVICE_UNAVAILABLE,
                "STORE_UNAVAILABLE",
                "Service unavailable",
                "the data store is unreachable",
                ctx,
            )
        }
    }
}
