//! Dispatcher: matches each request against the route table and hands the
//! body to the service's operation handler.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Request, State};
use axum::http::{HeaderValue, header};
use axum::response::Response;
use bytes::Bytes;
use tracing::debug;

use calc_core::{Operation, Outcome, Route, RouteTable};

use crate::emit::emit;

/// Largest inbound body accepted, in bytes.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Callback that produces the outcome for one routed request.
///
/// The calculator evaluates the body locally; the proxy forwards it to the
/// origin. Both plug in here.
pub type OperationHandler = Arc<dyn Fn(Operation, Bytes) -> BoxFuture + Send + Sync>;

pub type BoxFuture = Pin<Box<dyn Future<Output = Outcome> + Send>>;

/// Shared state for the dispatcher.
#[derive(Clone)]
pub struct ApiState {
    pub routes: Arc<RouteTable>,
    pub handler: OperationHandler,
}

/// Build a router that serves every path through the route table.
pub fn build_router(routes: RouteTable, handler: OperationHandler) -> Router {
    let state = ApiState {
        routes: Arc::new(routes),
        handler,
    };
    Router::new().fallback(dispatch).with_state(state)
}

async fn dispatch(State(state): State<ApiState>, request: Request) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let operation = match state.routes.route(&method, &path) {
        Route::Matched(operation) => operation,
        Route::Fixed(outcome) => {
            let not_allowed = outcome == Outcome::MethodNotAllowed;
            let mut response = emit(outcome);
            if not_allowed {
                if let Some(allow) = state
                    .routes
                    .allowed_method(&path)
                    .and_then(|m| HeaderValue::from_str(m.as_str()).ok())
                {
                    response.headers_mut().insert(header::ALLOW, allow);
                }
            }
            return response;
        }
    };

    let body = match axum::body::to_bytes(request.into_body(), MAX_BODY_BYTES).await {
        Ok(body) => body,
        Err(e) => return emit(Outcome::bad_request(format!("failed to read request body: {e}"))),
    };

    debug!(%method, path = %path, %operation, len = body.len(), "dispatching");
    emit((state.handler)(operation, body).await)
}
