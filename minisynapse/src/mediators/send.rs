//! The `send` mediator.

use crate::context::{Headers, MessageContext};
use crate::errors::MediationError;
use crate::observability::SpanTimer;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Url};
use std::time::Duration;
use tracing::debug;

/// Headers that describe a single connection and are never forwarded.
///
/// `host` and `content-length` are recomputed by the HTTP client for the
/// outbound request.
pub const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "content-length",
    "host",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Whether a header must not be forwarded across a hop.
#[must_use]
pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP_HEADERS
        .iter()
        .any(|h| h.eq_ignore_ascii_case(name))
}

/// Forwards the message to a fixed destination and adopts the reply.
///
/// Any status the upstream returns, 4xx and 5xx included, becomes the
/// outbound response. Only transport failures (connect, DNS, timeout,
/// reading the body) are errors, and they abort the run.
#[derive(Debug, Clone)]
pub struct SendMediator {
    url: Url,
    client: Client,
    timeout: Duration,
}

impl SendMediator {
    /// Creates a send mediator.
    ///
    /// `client` is shared by all mediators built from one configuration so
    /// connections are pooled across runs.
    #[must_use]
    pub const fn new(url: Url, client: Client, timeout: Duration) -> Self {
        Self {
            url,
            client,
            timeout,
        }
    }

    /// The destination address.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// The per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sends the context's method, headers and body to the destination and
    /// overwrites the outbound fields with the reply.
    ///
    /// # Errors
    ///
    /// Returns [`MediationError`] if the request cannot be built from the
    /// context, times out, or fails at the transport level.
    pub async fn mediate(&self, ctx: &mut MessageContext) -> Result<(), MediationError> {
        let method = Method::from_bytes(ctx.method().as_bytes()).map_err(|e| {
            MediationError::invalid_request(self.url.as_str(), format!("method '{}': {e}", ctx.method()))
        })?;
        let headers = self.outbound_headers(ctx.headers())?;

        debug!(
            message_id = %ctx.id(),
            url = %self.url,
            method = %method,
            "sending message"
        );
        let timer = SpanTimer::start("send");

        let response = self
            .client
            .request(method, self.url.clone())
            .headers(headers)
            .body(ctx.body().to_vec())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.classify(&e))?;

        let status = response.status().as_u16();
        let reply_headers = collect_headers(response.headers());
        let body = response.bytes().await.map_err(|e| self.classify(&e))?;

        debug!(
            message_id = %ctx.id(),
            url = %self.url,
            status,
            bytes = body.len(),
            duration_ms = timer.finish(),
            "received reply"
        );

        ctx.set_response(status, body.to_vec(), Some(reply_headers));
        Ok(())
    }

    fn outbound_headers(&self, headers: &Headers) -> Result<HeaderMap, MediationError> {
        let mut map = HeaderMap::with_capacity(headers.len());
        for (name, value) in headers {
            if is_hop_by_hop(name) {
                continue;
            }
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                MediationError::invalid_request(self.url.as_str(), format!("header name '{name}': {e}"))
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| {
                MediationError::invalid_request(self.url.as_str(), format!("header '{name}' value: {e}"))
            })?;
            map.append(header_name, header_value);
        }
        Ok(map)
    }

    fn classify(&self, err: &reqwest::Error) -> MediationError {
        if err.is_timeout() {
            MediationError::timeout(self.url.as_str(), self.timeout.as_secs_f64())
        } else {
            MediationError::transport(self.url.as_str(), error_chain(err))
        }
    }
}

/// Flattens a reply's headers; repeated names are joined with `", "`.
fn collect_headers(headers: &HeaderMap) -> Headers {
    let mut out = Headers::with_capacity(headers.len());
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        out.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }
    out
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hop_by_hop() {
        assert!(is_hop_by_hop("Host"));
        assert!(is_hop_by_hop("Transfer-Encoding"));
        assert!(!is_hop_by_hop("Content-Type"));
        assert!(!is_hop_by_hop("X-Request-Id"));
    }

    #[test]
    fn test_outbound_headers_skip_hop_by_hop() {
        let mediator = SendMediator::new(
            Url::parse("http://upstream.test/").unwrap(),
            Client::new(),
            Duration::from_secs(1),
        );
        let mut headers = Headers::new();
        headers.insert("Host".to_string(), "localhost:8080".to_string());
        headers.insert("Content-Length".to_string(), "3".to_string());
        headers.insert("X-Trace".to_string(), "abc".to_string());

        let map = mediator.outbound_headers(&headers).unwrap();

        assert_eq!(map.len(), 1);
        assert_eq!(map.get("x-trace").unwrap(), "abc");
    }

    #[test]
    fn test_outbound_headers_reject_invalid_values() {
        let mediator = SendMediator::new(
            Url::parse("http://upstream.test/").unwrap(),
            Client::new(),
            Duration::from_secs(1),
        );
        let mut headers = Headers::new();
        headers.insert("X-Bad".to_string(), "line\nbreak".to_string());

        let err = mediator.outbound_headers(&headers).unwrap_err();
        assert!(matches!(err, MediationError::InvalidRequest { .. }));
    }

    #[test]
    fn test_collect_headers_joins_repeats() {
        let mut map = HeaderMap::new();
        map.append("set-cookie", HeaderValue::from_static("a=1"));
        map.append("set-cookie", HeaderValue::from_static("b=2"));
        map.append("content-type", HeaderValue::from_static("text/plain"));

        let headers = collect_headers(&map);

        assert_eq!(headers.get("set-cookie").map(String::as_str), Some("a=1, b=2"));
        assert_eq!(headers.get("content-type").map(String::as_str), Some("text/plain"));
    }

    #[test]
    fn test_error_chain_without_sources() {
        let inner = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert_eq!(error_chain(&inner), "refused");
    }
}
