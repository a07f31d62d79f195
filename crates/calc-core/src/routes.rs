//! Declarative route table mapping `(method, path)` to an operation.

use http::Method;
use tracing::debug;

use crate::config::{RouteConfig, RouteStyle};
use crate::error::ConfigError;
use crate::outcome::Outcome;
use crate::types::Operation;

/// A single route. `method == None` accepts any method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub method: Option<Method>,
    pub path: String,
    pub operation: Operation,
}

/// Result of matching a request line against the table.
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    Matched(Operation),
    /// No operation applies; answer with this outcome as-is.
    Fixed(Outcome),
}

/// Exact-match route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    /// The four operation routes in the given style.
    pub fn from_style(style: RouteStyle, restrict_methods: bool) -> Self {
        let method = restrict_methods.then_some(Method::POST);
        Self {
            entries: Operation::ALL
                .into_iter()
                .map(|operation| RouteEntry {
                    method: method.clone(),
                    path: style.path(operation),
                    operation,
                })
                .collect(),
        }
    }

    /// Build a table from explicit entries, rejecting duplicate paths.
    pub fn from_entries(entries: Vec<RouteEntry>) -> Result<Self, ConfigError> {
        if entries.is_empty() {
            return Err(ConfigError::EmptyRoutes);
        }
        for (i, entry) in entries.iter().enumerate() {
            if !entry.path.starts_with('/') {
                return Err(ConfigError::RoutePath(entry.path.clone()));
            }
            if entries[..i].iter().any(|e| e.path == entry.path) {
                return Err(ConfigError::DuplicateRoute(entry.path.clone()));
            }
        }
        Ok(Self { entries })
    }

    pub fn from_config(config: &RouteConfig) -> Result<Self, ConfigError> {
        if config.entries.is_empty() {
            let restrict = config
                .restrict_methods
                .unwrap_or_else(|| config.style.restricts_methods());
            return Ok(Self::from_style(config.style, restrict));
        }

        let entries = config
            .entries
            .iter()
            .map(|e| -> Result<RouteEntry, ConfigError> {
                let method = e
                    .method
                    .as_deref()
                    .map(|m| {
                        Method::from_bytes(m.to_ascii_uppercase().as_bytes())
                            .map_err(|_| ConfigError::Method(m.to_string()))
                    })
                    .transpose()?;
                Ok(RouteEntry {
                    method,
                    path: e.path.clone(),
                    operation: e.operation,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_entries(entries)
    }

    /// Match a request. Unknown path → 404, known path with the wrong
    /// method → 405. No prefix or wildcard matching.
    pub fn route(&self, method: &Method, path: &str) -> Route {
        let Some(entry) = self.entries.iter().find(|e| e.path == path) else {
            debug!(%method, path, "no route");
            return Route::Fixed(Outcome::NotFound);
        };
        match &entry.method {
            Some(allowed) if allowed != method => {
                debug!(%method, path, allowed = %allowed, "method not allowed");
                Route::Fixed(Outcome::MethodNotAllowed)
            }
            _ => Route::Matched(entry.operation),
        }
    }

    /// Path the operation is served at, if the table has it.
    pub fn path_for(&self, operation: Operation) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.operation == operation)
            .map(|e| e.path.as_str())
    }

    /// Method restriction for a path, used to populate `Allow`.
    pub fn allowed_method(&self, path: &str) -> Option<&Method> {
        self.entries
            .iter()
            .find(|e| e.path == path)
            .and_then(|e| e.method.as_ref())
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::from_style(RouteStyle::Dotted, true)
    }
}
