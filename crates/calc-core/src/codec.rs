//! Envelope codec.
//!
//! Requests are decoded the way a streaming JSON decoder reads them: only the
//! first value in the payload is consumed and anything after it is ignored.
//! Unknown fields are ignored. Operand names match case-insensitively and a
//! repeated operand keeps its last value. Whether a missing operand is an
//! error depends on the [`DecodeMode`].

use std::fmt;

use bytes::Bytes;
use serde::de::{DeserializeOwned, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{CodecError, CodecResult};
use crate::types::{CalcRequest, CalcResult, ErrorEnvelope};

/// Media type of every envelope.
pub const CONTENT_TYPE: &str = "application/json";

/// How absent operands are treated when decoding a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodeMode {
    /// A missing operand decodes as `0`.
    #[default]
    Lenient,
    /// A missing operand is a decode error.
    Strict,
}

#[derive(Default)]
struct RawRequest {
    a: Option<f64>,
    b: Option<f64>,
}

impl<'de> Deserialize<'de> for RawRequest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RawRequestVisitor)
    }
}

struct RawRequestVisitor;

impl<'de> Visitor<'de> for RawRequestVisitor {
    type Value = RawRequest;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an object with numeric fields A and B")
    }

    fn visit_map<M: MapAccess<'de>>(self, mut map: M) -> Result<RawRequest, M::Error> {
        let mut raw = RawRequest::default();
        while let Some(key) = map.next_key::<String>()? {
            let slot = if key.eq_ignore_ascii_case("a") {
                &mut raw.a
            } else if key.eq_ignore_ascii_case("b") {
                &mut raw.b
            } else {
                map.next_value::<IgnoredAny>()?;
                continue;
            };
            // `null` leaves the operand as it was.
            if let Some(value) = map.next_value::<Option<f64>>()? {
                *slot = Some(value);
            }
        }
        Ok(raw)
    }
}

/// Serialize an envelope to its wire form.
pub fn encode<T: Serialize>(value: &T) -> CodecResult<Bytes> {
    Ok(Bytes::from(serde_json::to_vec(value)?))
}

/// Decode an inbound request body.
pub fn decode_request(payload: &[u8], mode: DecodeMode) -> CodecResult<CalcRequest> {
    let raw: RawRequest = decode_first(payload)?;
    match mode {
        DecodeMode::Lenient => Ok(CalcRequest::new(
            raw.a.unwrap_or_default(),
            raw.b.unwrap_or_default(),
        )),
        DecodeMode::Strict => Ok(CalcRequest::new(
            raw.a.ok_or(CodecError::MissingField("A"))?,
            raw.b.ok_or(CodecError::MissingField("B"))?,
        )),
    }
}

/// Decode a success envelope received from an origin.
pub fn decode_result(payload: &[u8]) -> CodecResult<CalcResult> {
    decode_first(payload)
}

/// Decode an error envelope received from an origin.
pub fn decode_error(payload: &[u8]) -> CodecResult<ErrorEnvelope> {
    decode_first(payload)
}

fn decode_first<T: DeserializeOwned>(payload: &[u8]) -> CodecResult<T> {
    serde_json::Deserializer::from_slice(payload)
        .into_iter::<T>()
        .next()
        .ok_or(CodecError::Empty)?
        .map_err(CodecError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_result_envelope() {
        let bytes = encode(&CalcResult::new(5.0)).unwrap();
        assert_eq!(&bytes[..], br#"{"Result":5}"#);

        let bytes = encode(&CalcResult::new(0.25)).unwrap();
        assert_eq!(&bytes[..], br#"{"Result":0.25}"#);
    }

    #[test]
    fn encodes_error_envelope() {
        let bytes = encode(&ErrorEnvelope::new("you tried to divide by zero")).unwrap();
        assert_eq!(&bytes[..], br#"{"Message":"you tried to divide by zero"}"#);
    }

    #[test]
    fn encode_rejects_non_finite_results() {
        let err = encode(&CalcResult::new(f64::INFINITY)).unwrap_err();
        assert_eq!(err.to_string(), "unsupported value: +Inf");

        let err = encode(&CalcResult::new(f64::NEG_INFINITY)).unwrap_err();
        assert_eq!(err.to_string(), "unsupported value: -Inf");

        let err = encode(&CalcResult::new(f64::NAN)).unwrap_err();
        assert_eq!(err.to_string(), "unsupported value: NaN");
    }

    #[test]
    fn decodes_request() {
        let req = decode_request(br#"{"A": 2, "B": 3.5}"#, DecodeMode::Lenient).unwrap();
        assert_eq!(req, CalcRequest::new(2.0, 3.5));
    }

    #[test]
    fn decode_accepts_lowercase_fields_and_ignores_unknown() {
        let req = decode_request(br#"{"a": 1, "b": -4, "C": "x"}"#, DecodeMode::Strict).unwrap();
        assert_eq!(req, CalcRequest::new(1.0, -4.0));
    }

    #[test]
    fn repeated_operands_keep_the_last_value() {
        let req = decode_request(br#"{"A":1,"A":2,"B":3}"#, DecodeMode::Lenient).unwrap();
        assert_eq!(req, CalcRequest::new(2.0, 3.0));

        let req = decode_request(br#"{"A":1,"a":2,"B":3,"b":4}"#, DecodeMode::Strict).unwrap();
        assert_eq!(req, CalcRequest::new(2.0, 4.0));
    }

    #[test]
    fn null_operand_does_not_overwrite() {
        let req = decode_request(br#"{"A":5,"A":null,"B":null}"#, DecodeMode::Lenient).unwrap();
        assert_eq!(req, CalcRequest::new(5.0, 0.0));

        let err = decode_request(br#"{"A":5,"B":null}"#, DecodeMode::Strict).unwrap_err();
        assert_eq!(err.to_string(), "missing required field \"B\"");
    }

    #[test]
    fn decode_ignores_trailing_data() {
        let req = decode_request(br#"{"A":1,"B":2} garbage"#, DecodeMode::Lenient).unwrap();
        assert_eq!(req, CalcRequest::new(1.0, 2.0));
    }

    #[test]
    fn lenient_decode_defaults_missing_operands() {
        let req = decode_request(br#"{"A": 7}"#, DecodeMode::Lenient).unwrap();
        assert_eq!(req, CalcRequest::new(7.0, 0.0));
    }

    #[test]
    fn strict_decode_rejects_missing_operands() {
        let err = decode_request(br#"{"A": 7}"#, DecodeMode::Strict).unwrap_err();
        assert_eq!(err.to_string(), "missing required field \"B\"");
    }

    #[test]
    fn decode_rejects_malformed_payloads() {
        assert!(matches!(
            decode_request(b"", DecodeMode::Lenient),
            Err(CodecError::Empty)
        ));
        assert!(matches!(
            decode_request(b"   ", DecodeMode::Lenient),
            Err(CodecError::Empty)
        ));
        assert!(matches!(
            decode_request(br#"{"A": "two"}"#, DecodeMode::Lenient),
            Err(CodecError::Json(_))
        ));
        assert!(matches!(
            decode_request(br#"{"A": 1, "B""#, DecodeMode::Lenient),
            Err(CodecError::Json(_))
        ));
        assert!(matches!(
            decode_request(b"42", DecodeMode::Lenient),
            Err(CodecError::Json(_))
        ));
        assert!(matches!(
            decode_request(b"[1, 2]", DecodeMode::Lenient),
            Err(CodecError::Json(_))
        ));
    }

    #[test]
    fn origin_envelopes_require_their_field() {
        assert_eq!(decode_result(br#"{"Result": 1.5}"#).unwrap(), CalcResult::new(1.5));
        assert!(decode_result(b"{}").is_err());

        assert_eq!(
            decode_error(br#"{"Message": "nope"}"#).unwrap(),
            ErrorEnvelope::new("nope")
        );
        assert!(decode_error(b"<html>").is_err());
    }
}
