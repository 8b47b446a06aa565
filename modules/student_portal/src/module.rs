use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use modkit::{HealthCheck, TracedClient};
use tracing::{debug, info};

use crate::api::rest::{openapi, routes};
use crate::config::StudentPortalConfig;
use crate::contract::client::StudentPortalApi;
use crate::domain::clock::{Clock, SystemClock};
use crate::domain::repo::RecordStore;
use crate::domain::service::{Service, ServiceConfig};
use crate::gateways::local::StudentPortalLocalClient;
use crate::infra::storage::{InMemoryRecordStore, SupabaseRecordStore};

/// The student portal module: one service instance shared by the REST
/// layer, the in-process client and the health probe.
#[derive(Clone)]
pub struct StudentPortal {
    service: Arc<Service>,
}

impl StudentPortal {
    pub fn new(
        store: Arc<dyn RecordStore>,
        clock: Arc<dyn Clock>,
        cfg: &StudentPortalConfig,
    ) -> Self {
        debug!(
            table = %cfg.table,
            scan_page_size = cfg.scan_page_size,
            request_timeout_ms = cfg.request_timeout_ms,
            "student_portal config loaded"
        );
        let service = Service::new(
            store,
            clock,
            ServiceConfig {
                store_timeout: Duration::from_millis(cfg.request_timeout_ms),
            },
        );
        Self {
            service: Arc::new(service),
        }
    }

    /// Production wiring: Supabase store and the system clock.
    pub fn with_supabase(
        url: &str,
        service_role_key: &str,
        cfg: &StudentPortalConfig,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("student-portal/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let client = TracedClient::new(http)
            .with_timeout(Duration::from_millis(cfg.request_timeout_ms));
        let store = SupabaseRecordStore::new(
            client,
            url,
            service_role_key,
            &cfg.table,
            cfg.scan_page_size,
        )?;
        info!(endpoint = %store.endpoint(), "using Supabase record store");
        Ok(Self::new(Arc::new(store), Arc::new(SystemClock), cfg))
    }

    /// `--mock` wiring: in-memory rows from `fixture_path`, or none.
    pub fn with_fixture(cfg: &StudentPortalConfig) -> anyhow::Result<Self> {
        let store = match &cfg.fixture_path {
            Some(path) => InMemoryRecordStore::from_fixture(Path::new(path))?,
            None => {
                info!("no fixture_path configured, mock store starts empty");
                InMemoryRecordStore::default()
            }
        };
        Ok(Self::new(Arc::new(store), Arc::new(SystemClock), cfg))
    }

    pub fn service(&self) -> Arc<Service> {
        self.service.clone()
    }

    /// In-process client for other modules.
    pub fn client(&self) -> Arc<dyn StudentPortalApi> {
        Arc::new(StudentPortalLocalClient::new(self.service.clone()))
    }

    pub fn register_rest(&self, router: axum::Router) -> axum::Router {
        info!("Registering student_portal REST routes");
        routes::register_routes(router, self.service.clone())
    }

    pub fn openapi(&self) -> serde_json::Value {
        openapi::document()
    }

    pub fn health(&self) -> Arc<dyn HealthCheck> {
        Arc::new(StoreHealth(self.service.clone()))
    }
}

/// Reports whether the record store answers.
pub struct StoreHealth(Arc<Service>);

#[async_trait]
impl HealthCheck for StoreHealth {
    fn component(&self) -> &str {
        "database"
    }

    async fn check(&self) -> Result<(), String> {
        self.0.ping().await.map_err(|e| e.to_string())
    }
}
