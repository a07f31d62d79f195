//! Response emitter.
//!
//! Turns an [`Outcome`] into exactly one HTTP response. The emitter returns
//! the response by value, so a handler cannot write twice or leave a request
//! unanswered.

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use tracing::{debug, error, warn};

use calc_core::{CONTENT_TYPE, ErrorEnvelope, Outcome, codec};

/// Emit the response for an outcome.
///
/// If the outcome's body cannot be encoded the response falls back to a 500
/// carrying the encoder's message.
pub fn emit(outcome: Outcome) -> Response {
    let status = outcome.status();
    let encoded = match (&outcome, outcome.error()) {
        (Outcome::Success(result), _) => codec::encode(result),
        (_, Some(envelope)) => codec::encode(&envelope),
        (_, None) => {
            error!(status = status.as_u16(), "failure outcome has no error envelope");
            return emit_internal(&ErrorEnvelope::new("response has no error envelope"));
        }
    };

    match encoded {
        Ok(body) => {
            debug!(status = status.as_u16(), "response emitted");
            respond(status, body)
        }
        Err(e) => {
            warn!(status = status.as_u16(), error = %e, "failed to encode response body, answering 500");
            emit_internal(&ErrorEnvelope::from(&e))
        }
    }
}

/// Last-resort 500. An envelope holding only a string always encodes; if it
/// does not, there is nothing left to answer with and the process aborts.
fn emit_internal(envelope: &ErrorEnvelope) -> Response {
    match codec::encode(envelope) {
        Ok(body) => respond(StatusCode::INTERNAL_SERVER_ERROR, body),
        Err(e) => {
            error!(error = %e, message = %envelope.message, "failed to encode internal error envelope");
            std::process::abort();
        }
    }
}

fn respond(status: StatusCode, body: Bytes) -> Response {
    (status, [(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response()
}
