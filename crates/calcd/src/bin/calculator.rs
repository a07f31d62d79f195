//! calculator — serves the four arithmetic operations.

use clap::Parser;
use tracing::info;

use calcd::CalculatorArgs;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    calcd::init_tracing();

    let config = CalculatorArgs::parse().into_config()?;
    let router = calc_engine::build_router(&config)?;
    info!(
        routes = ?config.routes.style,
        decode = ?config.decode.mode,
        "calculator starting"
    );

    calcd::run("calculator", config.listen, router).await
}
