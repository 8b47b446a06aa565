use anyhow::Result;
use tokio_util::sync::CancellationToken;

/// Resolve once the process receives SIGTERM or Ctrl+C.
pub async fn wait_for_shutdown() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        tokio::select! {
            _ = sigterm.recv() => {},
            _ = sigint.recv()  => {},
            _ = tokio::signal::ctrl_c() => {},
        }
        Ok(())
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        Ok(())
    }
}

/// Spawn a watcher that cancels `token` on the first shutdown signal.
///
/// The watcher also exits quietly if the token is cancelled elsewhere first.
/// A listener that cannot be installed leaves the token alone.
pub fn cancel_on_shutdown(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            res = wait_for_shutdown() => match res {
                Ok(()) => {
                    tracing::info!("shutdown: signal received");
                    token.cancel();
                }
                Err(e) => {
                    tracing::warn!(error = %e, "shutdown: signal listener failed");
                    token.cancelled().await;
                }
            },
            _ = token.cancelled() => {}
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn watcher_exits_when_token_cancelled_elsewhere() {
        let token = CancellationToken::new();
        let handle = cancel_on_shutdown(token.clone());
        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("watcher should finish")
            .expect("watcher task should not panic");
    }
}
