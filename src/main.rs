use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod client;
mod config;
mod error;
mod models;
mod session;
mod web;

use config::WebConfig;
use web::{WebState, build_web_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "easynas_web=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting easyNAS web console...");

    let config = WebConfig::from_env()?;
    let addr = config.listen_addr;

    tracing::info!("Backend API: {}/api/v1", config.api_url);
    if !config.secure_cookie {
        tracing::warn!("Session cookie sent without Secure flag (EASYNAS_SECURE_COOKIE unset)");
    }

    let app = build_web_router(Arc::new(WebState::new(config)));

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Web UI: http://{}/", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
