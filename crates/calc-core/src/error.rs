//! Error types for the core crate.

use thiserror::Error;

/// Result type alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors produced while encoding or decoding envelopes.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The payload held no JSON value at all.
    #[error("EOF")]
    Empty,

    #[error("missing required field \"{0}\"")]
    MissingField(&'static str),

    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

/// An operation selector that names none of the four operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid operation selected")]
pub struct UnknownOperation(pub String);

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid upstream url {url:?}: {reason}")]
    UpstreamUrl { url: String, reason: String },

    #[error("upstream has no route for operation {0}")]
    MissingUpstreamRoute(crate::types::Operation),

    #[error("route table is empty")]
    EmptyRoutes,

    #[error("duplicate route for path {0}")]
    DuplicateRoute(String),

    #[error("invalid http method {0:?}")]
    Method(String),

    #[error("route path {0:?} must start with '/'")]
    RoutePath(String),
}
