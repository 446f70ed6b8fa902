//! CRM gateway server binary.
//!
//! # Environment Variables
//!
//! * `CRM_TOKEN` - CRM private app token (required)
//! * `CRM_API_HOST` - CRM API host, e.g. `api.hubapi.com` (required)
//! * `CRM_API_SCHEMA`, `CRM_CONTACTS_PATH`, `CRM_FORMS_PATH`, `CRM_PORTAL_ID`,
//!   `CRM_FORMS_REGION`, `CRM_CONNECT_TIMEOUT_SECS`, `CRM_READ_TIMEOUT_SECS` - optional
//! * `GATEWAY_HOST` / `GATEWAY_PORT` - bind address (default: 127.0.0.1:8080)
//! * `GATEWAY_PROXY_PREFIX` - reverse-proxy prefix (default: /hubspot)
//! * `GATEWAY_LOG_LEVEL` - log filter when `RUST_LOG` is unset (default: info)
//! * `GATEWAY_CRM_CONFIG_FILE` - optional credential file

use std::sync::Arc;

use anyhow::Context;
use crm_gateway_core::{Gateway, RawConfig, UreqTransport};
use crm_gateway_server::config::ServerConfig;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let server_config = ServerConfig::from_env().context("loading GATEWAY_* configuration")?;
    init_tracing(&server_config.log_level);

    let raw = RawConfig::load(server_config.crm_config_file.as_deref())
        .context("loading CRM_* configuration")?;
    let mut gateway: Gateway<UreqTransport> = Gateway::new();
    gateway
        .initialize(&raw)
        .context("activating CRM gateway")?;
    let gateway = Arc::new(gateway);

    let addr = server_config.server_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, proxy_prefix = %server_config.proxy_prefix, "CRM gateway listening");

    axum::serve(
        listener,
        crm_gateway_server::app(Arc::clone(&gateway), &server_config.proxy_prefix),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    if let Ok(mut gateway) = Arc::try_unwrap(gateway) {
        gateway.shutdown();
    }
    tracing::info!("server shutdown complete");
    Ok(())
}

fn init_tracing(log_level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutdown signal received");
}
