//! calc-core — shared types for the calculator and its proxy.
//!
//! Holds everything both services must agree on byte-for-byte: the wire
//! envelopes and their codec, the [`Outcome`] union every handler produces,
//! the [`RouteTable`] that maps requests to operations, and the TOML
//! configuration of both services.

pub mod codec;
pub mod config;
pub mod error;
pub mod outcome;
pub mod routes;
pub mod types;

pub use codec::{CONTENT_TYPE, DecodeMode};
pub use config::{CalculatorConfig, ProxyConfig, RouteConfig, RouteStyle, UpstreamConfig};
pub use error::{CodecError, ConfigError, UnknownOperation};
pub use outcome::Outcome;
pub use routes::{Route, RouteEntry, RouteTable};
pub use types::{CalcRequest, CalcResult, ErrorEnvelope, Operation};
