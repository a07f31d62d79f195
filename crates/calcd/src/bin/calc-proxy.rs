//! calc-proxy — forwards operations to the calculator and relays its answer.

use clap::Parser;
use tracing::info;

use calcd::ProxyArgs;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    calcd::init_tracing();

    let config = ProxyArgs::parse().into_config()?;
    let router = calc_proxy::build_router(&config)?;
    info!(
        routes = ?config.routes.style,
        upstream = %config.upstream.base_url,
        "calc-proxy starting"
    );

    calcd::run("calc-proxy", config.listen, router).await
}
