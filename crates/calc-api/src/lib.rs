//! calc-api — the HTTP surface shared by the calculator and the proxy.
//!
//! Both services answer the same routes with the same envelopes; they only
//! differ in how an [`Outcome`](calc_core::Outcome) is produced. This crate
//! owns everything else:
//!
//! ```text
//! request
//!   │
//!   ▼
//! dispatch ── RouteTable::route ──► 404 / 405 ─┐
//!   │                                           │
//!   ▼                                           │
//! OperationHandler(operation, body) ─► Outcome ─┤
//!                                               ▼
//!                                             emit ──► response
//! ```

pub mod dispatch;
pub mod emit;

pub use dispatch::{ApiState, BoxFuture, MAX_BODY_BYTES, OperationHandler, build_router};
pub use emit::emit;
