//! calc-proxy — front-facing proxy for the calculator.
//!
//! Serves the same routes as the calculator. Each routed request is
//! forwarded, body untouched, to the origin path serving the same operation,
//! and the origin's answer is relayed through the shared emitter.

pub mod invoker;

use std::sync::Arc;

use axum::Router;
use bytes::Bytes;
use http::Uri;
use tracing::{info, warn};

use calc_api::{BoxFuture, OperationHandler};
use calc_core::{ConfigError, Operation, Outcome, ProxyConfig, RouteTable, UpstreamConfig};

pub use invoker::{TransportError, UpstreamInvoker};

/// The origin as seen from the proxy: where it lives, which paths it
/// serves, and how long to wait for it.
#[derive(Debug, Clone)]
pub struct Upstream {
    base: Uri,
    routes: RouteTable,
    invoker: UpstreamInvoker,
}

impl Upstream {
    pub fn new(base: Uri, routes: RouteTable, invoker: UpstreamInvoker) -> Self {
        Self {
            base,
            routes,
            invoker,
        }
    }

    pub fn from_config(config: &UpstreamConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            config.base_uri()?,
            RouteTable::from_config(&config.routes)?,
            UpstreamInvoker::new(config.timeout()),
        ))
    }

    /// Full origin URL for an operation. A path on the base URL is kept as a
    /// prefix.
    pub fn url_for(&self, operation: Operation) -> Option<Uri> {
        let path = self.routes.path_for(operation)?;
        let scheme = self.base.scheme_str().unwrap_or("http");
        let authority = self.base.authority()?;
        let prefix = self.base.path().trim_end_matches('/');
        format!("{scheme}://{authority}{prefix}{path}").parse().ok()
    }

    pub fn serves(&self, operation: Operation) -> bool {
        self.routes.path_for(operation).is_some()
    }

    /// Forward one request body to the origin.
    pub async fn forward(&self, operation: Operation, body: Bytes) -> Outcome {
        match self.url_for(operation) {
            Some(url) => self.invoker.invoke(body, &url).await,
            None => {
                warn!(%operation, base = %self.base, "no upstream url for operation");
                Outcome::internal_error(format!("no upstream route for operation {operation}"))
            }
        }
    }
}

/// Operation handler for the proxy service.
pub fn proxy_handler(upstream: Arc<Upstream>) -> OperationHandler {
    Arc::new(move |operation: Operation, body: Bytes| -> BoxFuture {
        let upstream = upstream.clone();
        Box::pin(async move { upstream.forward(operation, body).await })
    })
}

/// Build the proxy's router from its configuration.
///
/// Every operation the proxy routes must also be routed by the origin.
pub fn build_router(config: &ProxyConfig) -> Result<Router, ConfigError> {
    let routes = RouteTable::from_config(&config.routes)?;
    let upstream = Upstream::from_config(&config.upstream)?;

    for entry in routes.entries() {
        if !upstream.serves(entry.operation) {
            return Err(ConfigError::MissingUpstreamRoute(entry.operation));
        }
    }

    info!(
        base = %upstream.base,
        timeout = ?upstream.invoker.timeout(),
        "proxying to upstream"
    );
    Ok(calc_api::build_router(routes, proxy_handler(Arc::new(upstream))))
}
