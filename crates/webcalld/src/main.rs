//! webcalld — WebRTC call signaling daemon.

use std::sync::Arc;

use anyhow::{Context, Result};

use webcall_core::config::{data_dir, WebcallConfig};
use webcall_services::{CredentialStore, FileCredentialStore, MemoryCredentialStore, SignalCore};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = WebcallConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = WebcallConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        WebcallConfig::default()
    });
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "webcalld starting");

    // Credentials
    let store: Arc<dyn CredentialStore> = if config.session.credential_path.as_os_str().is_empty() {
        tracing::warn!("no credential path configured, sessions are kept in memory only");
        Arc::new(MemoryCredentialStore::new())
    } else {
        // Relative paths live under the data dir.
        let path = data_dir().join(&config.session.credential_path);
        let store = FileCredentialStore::open(path.clone())
            .with_context(|| format!("failed to open credential store {}", path.display()))?;
        tracing::info!(path = %path.display(), "credential store ready");
        Arc::new(store)
    };

    // Shared state
    let core = SignalCore::new(store, &config.session);
    let state = webcall_api::ApiState::new(core, &config.server);
    if config.server.maintenance_mode {
        tracing::warn!("maintenance mode enabled");
    }

    // ── Wait for exit ────────────────────────────────────────────────────────

    tokio::select! {
        r = webcall_api::serve(state, &config.network.bind_addr, config.network.http_port) => {
            r.context("signaling server failed")?;
        }
        _ = tokio::signal::ctrl_c() => tracing::info!("shutting down"),
    }

    Ok(())
}
