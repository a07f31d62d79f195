//! The closed set of results of handling one request.

use http::StatusCode;

use crate::types::{CalcResult, ErrorEnvelope};

/// Outcome of one request, handed to the response emitter.
///
/// Every component that handles a request produces exactly one of these.
/// The status each variant is answered with is fixed by [`Outcome::status`].
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// 200 with a result envelope.
    Success(CalcResult),
    /// 400: malformed request or domain error.
    BadRequest(ErrorEnvelope),
    /// 503: the origin could not be reached.
    ServiceUnavailable(ErrorEnvelope),
    /// The origin answered with a non-success status; passed through.
    OriginError(StatusCode, ErrorEnvelope),
    /// 500: a local encode/decode defect.
    InternalError(ErrorEnvelope),
    /// 404: no route for the path.
    NotFound,
    /// 405: the path is known but not for this method.
    MethodNotAllowed,
}

impl Outcome {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(ErrorEnvelope::new(message))
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(ErrorEnvelope::new(message))
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError(ErrorEnvelope::new(message))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Success(_) => StatusCode::OK,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::OriginError(status, _) => *status,
            Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    /// The error envelope carried by a failure outcome, `None` on success.
    pub fn error(&self) -> Option<ErrorEnvelope> {
        match self {
            Self::Success(_) => None,
            Self::BadRequest(env)
            | Self::ServiceUnavailable(env)
            | Self::OriginError(_, env)
            | Self::InternalError(env) => Some(env.clone()),
            Self::NotFound => Some(ErrorEnvelope::new("404 page not found")),
            Self::MethodNotAllowed => Some(ErrorEnvelope::new("method not allowed")),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}
