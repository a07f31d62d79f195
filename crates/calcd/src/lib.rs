//! calcd — the calculator and calculator-proxy daemons.
//!
//! Two binaries share this crate:
//!
//! ```text
//! calculator --port 8090 [--config calculator.toml]
//! calc-proxy --port 8080 --upstream localhost:8090 [--config proxy.toml]
//! ```
//!
//! Flags override the config file, the config file overrides defaults. Route
//! shapes, decode mode and the upstream timeout are set in the config file.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use axum::Router;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};

use calc_core::{CalculatorConfig, ProxyConfig};

/// Command line of the `calculator` binary.
#[derive(Debug, Parser)]
#[command(name = "calculator", about = "Arithmetic calculator service", version)]
pub struct CalculatorArgs {
    /// TOML config file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Port to listen on.
    #[arg(long)]
    pub port: Option<u16>,
}

impl CalculatorArgs {
    pub fn into_config(self) -> anyhow::Result<CalculatorConfig> {
        let mut config = match &self.config {
            Some(path) => CalculatorConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => CalculatorConfig::default(),
        };
        if let Some(port) = self.port {
            config.listen.set_port(port);
        }
        Ok(config)
    }
}

/// Command line of the `calc-proxy` binary.
#[derive(Debug, Parser)]
#[command(name = "calc-proxy", about = "Proxy in front of the calculator service", version)]
pub struct ProxyArgs {
    /// TOML config file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Port to listen on.
    #[arg(long)]
    pub port: Option<u16>,

    /// Calculator base URL (host:port or http://host:port).
    #[arg(long)]
    pub upstream: Option<String>,
}

impl ProxyArgs {
    pub fn into_config(self) -> anyhow::Result<ProxyConfig> {
        let mut config = match &self.config {
            Some(path) => ProxyConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => ProxyConfig::default(),
        };
        if let Some(port) = self.port {
            config.listen.set_port(port);
        }
        if let Some(upstream) = self.upstream {
            config.upstream.base_url = upstream;
        }
        Ok(config)
    }
}

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,calc=debug")),
        )
        .init();
}

/// Bind `addr` and serve `router` until Ctrl-C.
pub async fn run(name: &str, addr: SocketAddr, router: Router) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(service = name, addr = %listener.local_addr()?, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!(service = name, "stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to install Ctrl-C handler, running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
