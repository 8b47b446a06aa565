use std::sync::Arc;

use axum::{routing::get, Extension, Router};

use crate::api::rest::handlers;
use crate::domain::service::Service;

/// Mount the portal's read endpoints on `router`.
pub fn register_routes(router: Router, service: Arc<Service>) -> Router {
    router
        .route("/", get(handlers::banner))
        .route("/tasks", get(handlers::tasks))
        .route("/marks", get(handlers::marks))
        .route("/reports", get(handlers::reports))
        .route("/materials", get(handlers::materials))
        .route("/profile", get(handlers::profile))
        .route("/schedule", get(handlers::schedule))
        .route("/schedule/today", get(handlers::today))
        .route("/schedule/tomorrow", get(handlers::tomorrow))
        .route("/schedule/yesterday", get(handlers::yesterday))
        .route("/schedule/week", get(handlers::week))
        .route("/users/comprehensive", get(handlers::comprehensive))
        .route("/users/data", get(handlers::user_data))
        .layer(Extension(service))
}
