//! Service configuration (TOML) for the calculator and the proxy.
//!
//! Every section has defaults, so an empty file is a valid configuration.
//! Command-line flags are applied on top by the binaries.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use http::Uri;
use serde::{Deserialize, Serialize};

use crate::codec::DecodeMode;
use crate::error::ConfigError;
use crate::types::Operation;

pub const DEFAULT_CALCULATOR_LISTEN: &str = "0.0.0.0:8090";
pub const DEFAULT_PROXY_LISTEN: &str = "0.0.0.0:8080";
pub const DEFAULT_UPSTREAM: &str = "localhost:8090";
pub const DEFAULT_UPSTREAM_TIMEOUT_MS: u64 = 30_000;

/// Shape of the four operation paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteStyle {
    /// `/calculator.sum`, POST only.
    #[default]
    Dotted,
    /// `/calculator/sum`, any method.
    Slashed,
}

impl RouteStyle {
    pub fn path(self, op: Operation) -> String {
        match self {
            Self::Dotted => format!("/calculator.{}", op.selector()),
            Self::Slashed => format!("/calculator/{}", op.selector()),
        }
    }

    pub fn restricts_methods(self) -> bool {
        matches!(self, Self::Dotted)
    }
}

impl std::str::FromStr for RouteStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dotted" => Ok(Self::Dotted),
            "slashed" => Ok(Self::Slashed),
            other => Err(format!("unknown route style {other:?} (expected dotted or slashed)")),
        }
    }
}

/// One explicitly declared route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntryConfig {
    /// Omitted means any method is accepted.
    pub method: Option<String>,
    pub path: String,
    pub operation: Operation,
}

/// `[routes]` section. Explicit `entries` replace the style-derived table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteConfig {
    pub style: RouteStyle,
    pub restrict_methods: Option<bool>,
    pub entries: Vec<RouteEntryConfig>,
}

impl RouteConfig {
    pub fn with_style(style: RouteStyle) -> Self {
        Self {
            style,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    pub mode: DecodeMode,
}

/// Configuration of the calculator service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculatorConfig {
    pub listen: SocketAddr,
    pub routes: RouteConfig,
    pub decode: DecodeConfig,
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        Self {
            listen: default_addr(DEFAULT_CALCULATOR_LISTEN, 8090),
            routes: RouteConfig::default(),
            decode: DecodeConfig::default(),
        }
    }
}

/// `[upstream]` section of the proxy configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// `host:port` or `http://host:port[/prefix]`.
    pub base_url: String,
    /// Deadline for one upstream call; `0` disables it.
    pub timeout_ms: u64,
    /// Route shape the origin serves.
    pub routes: RouteConfig,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_UPSTREAM.to_string(),
            timeout_ms: DEFAULT_UPSTREAM_TIMEOUT_MS,
            routes: RouteConfig::default(),
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    /// Parse and validate `base_url`. A missing scheme means `http`.
    pub fn base_uri(&self) -> Result<Uri, ConfigError> {
        let raw = self.base_url.trim();
        let invalid = |reason: String| ConfigError::UpstreamUrl {
            url: self.base_url.clone(),
            reason,
        };

        let candidate = if raw.contains("://") {
            raw.to_string()
        } else {
            format!("http://{raw}")
        };
        let uri: Uri = candidate.parse().map_err(|e: http::uri::InvalidUri| invalid(e.to_string()))?;

        match uri.scheme_str() {
            Some("http") => {}
            Some(other) => return Err(invalid(format!("unsupported scheme {other}, only http is supported"))),
            None => return Err(invalid("missing scheme".to_string())),
        }
        match uri.authority() {
            Some(authority) if !authority.host().is_empty() => {}
            _ => return Err(invalid("missing host".to_string())),
        }
        if uri.query().is_some() {
            return Err(invalid("query strings are not supported".to_string()));
        }
        Ok(uri)
    }
}

/// Configuration of the proxy service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub listen: SocketAddr,
    pub routes: RouteConfig,
    pub upstream: UpstreamConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen: default_addr(DEFAULT_PROXY_LISTEN, 8080),
            routes: RouteConfig::default(),
            upstream: UpstreamConfig::default(),
        }
    }
}

impl CalculatorConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        from_file(path)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

impl ProxyConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        from_file(path)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

fn from_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

fn default_addr(addr: &str, port: u16) -> SocketAddr {
    addr.parse()
        .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], port)))
}
