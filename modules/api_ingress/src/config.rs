use serde::{Deserialize, Serialize};

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";

/// `modules.api_ingress` section of the server config.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiIngressConfig {
    /// Listen address; `None` falls back to `server.host:server.port`.
    pub bind_addr: Option<String>,
    pub enable_docs: bool,
    pub cors_enabled: bool,
    /// Per-request handler timeout.
    pub request_timeout_sec: u64,
    pub body_limit_bytes: usize,
}

impl Default for ApiIngressConfig {
    fn default() -> Self {
        Self {
            bind_addr: None,
            enable_docs: false,
            cors_enabled: false,
            request_timeout_sec: 30,
            body_limit_bytes: 16 * 1024 * 1024,
        }
    }
}

impl ApiIngressConfig {
    pub fn bind_addr(&self) -> &str {
        self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR)
    }
}
