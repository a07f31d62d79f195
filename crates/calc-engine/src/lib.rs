//! calc-engine — the calculator service.
//!
//! Decodes the request body, evaluates the routed operation and hands the
//! outcome to the shared emitter in `calc-api`.

pub mod evaluator;

use std::sync::Arc;

use axum::Router;
use bytes::Bytes;
use tracing::debug;

use calc_api::{BoxFuture, OperationHandler};
use calc_core::{CalculatorConfig, ConfigError, DecodeMode, Operation, Outcome, RouteTable, codec};

pub use evaluator::{DIVIDE_BY_ZERO, evaluate, evaluate_selector};

/// Decode `body` and evaluate `operation` on it.
pub fn handle(operation: Operation, body: &[u8], mode: DecodeMode) -> Outcome {
    match codec::decode_request(body, mode) {
        Ok(request) => evaluate(&request, operation),
        Err(e) => {
            debug!(%operation, error = %e, "request body rejected");
            Outcome::bad_request(e.to_string())
        }
    }
}

/// Operation handler for the calculator service.
pub fn calculator_handler(mode: DecodeMode) -> OperationHandler {
    Arc::new(move |operation: Operation, body: Bytes| -> BoxFuture {
        Box::pin(async move { handle(operation, &body, mode) })
    })
}

/// Build the calculator's router from its configuration.
pub fn build_router(config: &CalculatorConfig) -> Result<Router, ConfigError> {
    let routes = RouteTable::from_config(&config.routes)?;
    Ok(calc_api::build_router(routes, calculator_handler(config.decode.mode)))
}
