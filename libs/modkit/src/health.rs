//! Readiness probes exposed by modules and reported by the ingress.

use async_trait::async_trait;

/// A dependency whose reachability is reported on `/health`.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// Short name shown in the health payload, e.g. `database`.
    fn component(&self) -> &str;

    /// `Err` carries a human-readable reason.
    async fn check(&self) -> Result<(), String>;
}
