//! Upstream invoker.
//!
//! Makes one outbound call per proxied request over a fresh HTTP/1.1
//! connection and folds the three ways it can go wrong into an [`Outcome`]:
//!
//! | What happened | Outcome |
//! |---|---|
//! | connect / handshake / send / body read failed, or timed out | `ServiceUnavailable` |
//! | origin answered non-200 with a valid error envelope | `OriginError(status, envelope)` |
//! | origin answered non-200 with anything else | `InternalError` |
//! | origin answered 200 with a valid result envelope | `Success` |
//! | origin answered 200 with anything else | `InternalError` |
//!
//! The inbound body is forwarded untouched; validating it is the origin's job.

use std::time::Duration;

use bytes::Bytes;
use http::{Method, Request, StatusCode, Uri, header};
use http_body_util::{BodyExt, Full, Limited};
use hyper_util::rt::TokioIo;
use thiserror::Error;
use tokio::net::TcpStream;
use tracing::{debug, warn};

use calc_api::MAX_BODY_BYTES;
use calc_core::{CONTENT_TYPE, ErrorEnvelope, Outcome, codec};

/// Failure to get a complete response from the origin.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Post \"{uri}\": missing host")]
    MissingHost { uri: Uri },

    #[error("Post \"{uri}\": dial tcp {addr}: {source}")]
    Connect {
        uri: Uri,
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Post \"{uri}\": handshake failed: {source}")]
    Handshake {
        uri: Uri,
        #[source]
        source: hyper::Error,
    },

    #[error("Post \"{uri}\": {source}")]
    Build {
        uri: Uri,
        #[source]
        source: http::Error,
    },

    #[error("Post \"{uri}\": {source}")]
    Send {
        uri: Uri,
        #[source]
        source: hyper::Error,
    },

    #[error("Post \"{uri}\": reading response body: {source}")]
    Body {
        uri: Uri,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("upstream request timed out after {0:?}")]
    Timeout(Duration),
}

/// Forwards request bodies to an origin URL.
#[derive(Debug, Clone, Default)]
pub struct UpstreamInvoker {
    timeout: Option<Duration>,
}

impl UpstreamInvoker {
    /// `None` waits on the origin indefinitely.
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Forward `body` to `url` and translate what comes back.
    pub async fn invoke(&self, body: Bytes, url: &Uri) -> Outcome {
        let (status, payload) = match self.call(body, url).await {
            Ok(response) => response,
            Err(e) => {
                warn!(%url, error = %e, "upstream unreachable");
                return Outcome::ServiceUnavailable(ErrorEnvelope::from(&e));
            }
        };

        if status != StatusCode::OK {
            return match codec::decode_error(&payload) {
                Ok(envelope) => {
                    debug!(%url, status = status.as_u16(), message = %envelope.message, "origin reported error");
                    Outcome::OriginError(status, envelope)
                }
                Err(e) => {
                    warn!(%url, status = status.as_u16(), error = %e, "origin error body is malformed");
                    Outcome::InternalError(ErrorEnvelope::from(&e))
                }
            };
        }

        match codec::decode_result(&payload) {
            Ok(result) => Outcome::Success(result),
            Err(e) => {
                warn!(%url, error = %e, "origin result body is malformed");
                Outcome::InternalError(ErrorEnvelope::from(&e))
            }
        }
    }

    async fn call(&self, body: Bytes, url: &Uri) -> Result<(StatusCode, Bytes), TransportError> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, post(body, url))
                .await
                .map_err(|_| TransportError::Timeout(limit))?,
            None => post(body, url).await,
        }
    }
}

/// One POST over a dedicated connection. The whole response body, up to
/// [`MAX_BODY_BYTES`], is read before returning.
async fn post(body: Bytes, uri: &Uri) -> Result<(StatusCode, Bytes), TransportError> {
    let authority = uri
        .authority()
        .ok_or_else(|| TransportError::MissingHost { uri: uri.clone() })?;
    let host = authority.host().trim_start_matches('[').trim_end_matches(']');
    let port = authority.port_u16().unwrap_or(80);
    let addr = format!("{}:{port}", authority.host());

    let stream = TcpStream::connect((host, port))
        .await
        .map_err(|source| TransportError::Connect {
            uri: uri.clone(),
            addr: addr.clone(),
            source,
        })?;

    let io = TokioIo::new(stream);
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
        .await
        .map_err(|source| TransportError::Handshake {
            uri: uri.clone(),
            source,
        })?;

    // Drive the connection in the background; it ends when `sender` drops.
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            debug!(error = %e, "upstream connection closed with error");
        }
    });

    let path = uri.path_and_query().map_or("/", |p| p.as_str());
    let request = Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(header::HOST, authority.as_str())
        .header(header::CONTENT_TYPE, CONTENT_TYPE)
        .body(Full::new(body))
        .map_err(|source| TransportError::Build {
            uri: uri.clone(),
            source,
        })?;

    let response = sender
        .send_request(request)
        .await
        .map_err(|source| TransportError::Send {
            uri: uri.clone(),
            source,
        })?;

    let status = response.status();
    let payload = Limited::new(response.into_body(), MAX_BODY_BYTES)
        .collect()
        .await
        .map_err(|source| TransportError::Body {
            uri: uri.clone(),
            source,
        })?
        .to_bytes();

    debug!(%uri, status = status.as_u16(), len = payload.len(), "upstream responded");
    Ok((status, payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Read one request (head plus `content-length` body) off the stream.
    async fn read_request(stream: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(head_end) = text.find("\r\n\r\n") {
                let length = text[..head_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= head_end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Serve exactly one connection with a canned raw HTTP response and
    /// return what the client sent.
    async fn one_shot_origin(response: String) -> (Uri, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_request(&mut stream).await;
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
            request
        });
        let uri: Uri = format!("http://{addr}/calculator.sum").parse().unwrap();
        (uri, handle)
    }

    fn http_response(status_line: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    #[tokio::test]
    async fn success_is_relayed() {
        let (uri, origin) = one_shot_origin(http_response("200 OK", r#"{"Result":5}"#)).await;
        let outcome = UpstreamInvoker::default()
            .invoke(Bytes::from_static(br#"{"A":2,"B":3}"#), &uri)
            .await;
        assert_eq!(outcome, Outcome::Success(calc_core::CalcResult::new(5.0)));

        let sent = origin.await.unwrap();
        assert!(sent.starts_with("POST /calculator.sum HTTP/1.1\r\n"));
        assert!(sent.to_ascii_lowercase().contains("content-type: application/json"));
        assert!(sent.ends_with(r#"{"A":2,"B":3}"#));
    }

    #[tokio::test]
    async fn body_is_forwarded_verbatim() {
        let (uri, origin) = one_shot_origin(http_response("200 OK", r#"{"Result":0}"#)).await;
        let raw = "not even json";
        UpstreamInvoker::default()
            .invoke(Bytes::from_static(raw.as_bytes()), &uri)
            .await;
        assert!(origin.await.unwrap().ends_with(raw));
    }

    #[tokio::test]
    async fn origin_error_is_passed_through() {
        let (uri, _origin) = one_shot_origin(http_response(
            "400 Bad Request",
            r#"{"Message":"you tried to divide by zero"}"#,
        ))
        .await;
        let outcome = UpstreamInvoker::default().invoke(Bytes::new(), &uri).await;
        assert_eq!(
            outcome,
            Outcome::OriginError(
                StatusCode::BAD_REQUEST,
                ErrorEnvelope::new("you tried to divide by zero")
            )
        );
    }

    #[tokio::test]
    async fn malformed_origin_error_is_internal() {
        let (uri, _origin) = one_shot_origin(http_response("502 Bad Gateway", "<html>oops</html>")).await;
        let outcome = UpstreamInvoker::default().invoke(Bytes::new(), &uri).await;
        assert_eq!(outcome.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn malformed_success_body_is_internal() {
        let (uri, _origin) = one_shot_origin(http_response("200 OK", r#"{"Message":"hi"}"#)).await;
        let outcome = UpstreamInvoker::default().invoke(Bytes::new(), &uri).await;
        assert_eq!(outcome.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn oversized_origin_body_is_service_unavailable() {
        let padding = " ".repeat(MAX_BODY_BYTES);
        let (uri, _origin) =
            one_shot_origin(http_response("200 OK", &format!(r#"{{"Result":1}}{padding}"#))).await;
        let outcome = UpstreamInvoker::default().invoke(Bytes::new(), &uri).await;
        assert_eq!(outcome.status(), StatusCode::SERVICE_UNAVAILABLE);
        let message = outcome.error().unwrap().message;
        assert!(message.contains("reading response body"), "{message}");
    }

    #[tokio::test]
    async fn non_200_success_class_takes_error_path() {
        let (uri, _origin) = one_shot_origin(http_response("201 Created", r#"{"Result":1}"#)).await;
        let outcome = UpstreamInvoker::default().invoke(Bytes::new(), &uri).await;
        assert_eq!(outcome.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn refused_connection_is_service_unavailable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let uri: Uri = format!("http://{addr}/calculator.sum").parse().unwrap();
        let outcome = UpstreamInvoker::default().invoke(Bytes::new(), &uri).await;
        assert_eq!(outcome.status(), StatusCode::SERVICE_UNAVAILABLE);
        let message = outcome.error().unwrap().message;
        assert!(message.starts_with(&format!("Post \"{uri}\": dial tcp {addr}")), "{message}");
    }

    #[tokio::test]
    async fn hung_origin_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _hold = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(stream);
        });

        let uri: Uri = format!("http://{addr}/calculator.sum").parse().unwrap();
        let invoker = UpstreamInvoker::new(Some(Duration::from_millis(100)));
        let outcome = invoker.invoke(Bytes::new(), &uri).await;
        assert_eq!(
            outcome,
            Outcome::service_unavailable("upstream request timed out after 100ms")
        );
    }
}
