use std::sync::Arc;

use axum::{
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    Extension,
};
use modkit::HealthCheck;
use serde_json::{json, Map, Value};

/// Components probed by `/health`.
#[derive(Clone)]
pub struct HealthProbes {
    pub service: String,
    pub checks: Vec<Arc<dyn HealthCheck>>,
}

/// `{status, <component>: connected|disconnected, service, timestamp, error?}`.
/// Any failing component makes the whole service unhealthy (503).
pub async fn health_check(Extension(probes): Extension<Arc<HealthProbes>>) -> Response {
    let mut body = Map::new();
    let mut errors = Vec::new();

    for check in &probes.checks {
        let state = match check.check().await {
            Ok(()) => "connected",
            Err(e) => {
                tracing::warn!(component = check.component(), error = %e, "health probe failed");
                errors.push(format!("{}: {e}", check.component()));
                "disconnected"
            }
        };
        body.insert(check.component().to_string(), json!(state));
    }

    let healthy = errors.is_empty();
    body.insert(
        "status".into(),
        json!(if healthy { "healthy" } else { "unhealthy" }),
    );
    body.insert("service".into(), json!(probes.service));
    body.insert("timestamp".into(), json!(chrono::Utc::now().to_rfc3339()));
    if !healthy {
        body.insert("error".into(), json!(errors.join("; ")));
    }

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(Value::Object(body))).into_response()
}

pub async fn serve_openapi(Extension(doc): Extension<Arc<Value>>) -> Response {
    (
        [(header::CACHE_CONTROL, "no-store")],
        Json(doc.as_ref().clone()),
    )
        .into_response()
}

pub async fn serve_docs() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8"/>
  <title>Student Portal API</title>
  <script src="https://unpkg.com/@stoplight/elements@latest/web-components.min.js"></script>
  <link rel="stylesheet" href="https://unpkg.com/@stoplight/elements@latest/styles.min.css">
</head>
<body>
  <elements-api apiDescriptionUrl="/openapi.json" router="hash" layout="sidebar"></elements-api>
</body>
</html>"#,
    )
}
