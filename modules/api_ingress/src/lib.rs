use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{middleware::from_fn, routing::get, Extension, Router};
use modkit::HealthCheck;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
};

mod config;
pub mod request_id;
mod web;

pub use config::{ApiIngressConfig, DEFAULT_BIND_ADDR};

/// Owns the HTTP server: wraps module routers with the shared middleware
/// stack, `/health` and the OpenAPI endpoints.
pub struct ApiIngress {
    config: ApiIngressConfig,
    service_name: String,
    health: Vec<Arc<dyn HealthCheck>>,
    openapi: Option<Value>,
}

impl ApiIngress {
    pub fn new(config: ApiIngressConfig) -> Self {
        Self {
            config,
            service_name: "Student Portal API".to_string(),
            health: Vec::new(),
            openapi: None,
        }
    }

    pub fn config(&self) -> &ApiIngressConfig {
        &self.config
    }

    /// Name reported as `service` by `/health`.
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    /// Adds a component probed by `/health`.
    pub fn with_health(mut self, check: Arc<dyn HealthCheck>) -> Self {
        self.health.push(check);
        self
    }

    /// Document served at `/openapi.json` when docs are enabled.
    pub fn with_openapi(mut self, doc: Value) -> Self {
        self.openapi = Some(doc);
        self
    }

    /// Build the final router around `modules`.
    pub fn build_router(&self, modules: Router) -> Router {
        tracing::debug!(
            docs = self.config.enable_docs,
            cors = self.config.cors_enabled,
            probes = self.health.len(),
            "Building router"
        );

        let probes = Arc::new(web::HealthProbes {
            service: self.service_name.clone(),
            checks: self.health.clone(),
        });
        let mut router = Router::new()
            .route("/health", get(web::health_check))
            .layer(Extension(probes))
            .merge(modules);

        if self.config.enable_docs {
            match &self.openapi {
                Some(doc) => {
                    let docs = Router::new()
                        .route("/openapi.json", get(web::serve_openapi))
                        .route("/docs", get(web::serve_docs))
                        .layer(Extension(Arc::new(doc.clone())));
                    router = router.merge(docs);
                }
                None => tracing::warn!("enable_docs is set but no OpenAPI document was provided"),
            }
        }

        // Layers are listed innermost first; on the way in a request passes
        // SetRequestId -> PropagateRequestId -> extensions -> Trace -> Timeout
        // -> CORS -> BodyLimit.
        router = router.layer(RequestBodyLimitLayer::new(self.config.body_limit_bytes));
        if self.config.cors_enabled {
            router = router.layer(CorsLayer::permissive());
        }
        router = router.layer(TimeoutLayer::new(Duration::from_secs(
            self.config.request_timeout_sec,
        )));
        router = router.layer(request_id::create_trace_layer());
        router = router.layer(from_fn(request_id::push_req_id_to_extensions));

        let x_request_id = request_id::header();
        router = router.layer(PropagateRequestIdLayer::new(x_request_id.clone()));
        router.layer(SetRequestIdLayer::new(x_request_id, request_id::MakeReqId))
    }

    /// Bind and serve until `cancel` fires.
    pub async fn serve(&self, router: Router, cancel: CancellationToken) -> Result<()> {
        let bind_addr = self.config.bind_addr();
        let addr: SocketAddr = bind_addr
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid bind address '{}': {}", bind_addr, e))?;

        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("HTTP server bound on {}", addr);

        let shutdown = async move {
            cancel.cancelled().await;
            tracing::info!("HTTP server shutting down gracefully (cancellation)");
        };

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| anyhow::anyhow!(e))
    }
}
