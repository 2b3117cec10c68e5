//! Reply gate service: binary entrypoint.
//! Boots the Axum HTTP server, wiring routes, shared state, metrics and hot reload.

use std::net::SocketAddr;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reply_gate::config::config_path;
use reply_gate::metrics::Metrics;
use reply_gate::reload::start_hot_reload_thread;
use reply_gate::AppState;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 7200;

/// `RUST_LOG` wins; otherwise `reply_gate=info,warn`. `LOG_FORMAT=json` for JSON lines.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("reply_gate=info,warn"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

fn bind_addr() -> anyhow::Result<SocketAddr> {
    let host = std::env::var("APP_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
    let port = match std::env::var("APP_PORT") {
        Ok(p) => p.trim().parse::<u16>().context("APP_PORT must be a port number")?,
        Err(_) => DEFAULT_PORT,
    };
    format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid bind address {host}:{port}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let metrics = Metrics::init()?;
    let state = AppState::from_env().context("load analyzer config")?;
    start_hot_reload_thread(state.analyzer.clone(), config_path());

    let app = reply_gate::app(state, &metrics);

    let addr = bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    info!(%addr, "reply gate listening");
    axum::serve(listener, app).await?;
    Ok(())
}
