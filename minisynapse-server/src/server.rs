//! Router, request handler and reload triggers.

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use minisynapse::context::{Headers, MessageContext};
use minisynapse::mediators::is_hop_by_hop;
use minisynapse::registry::SequenceRegistry;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    registry: Arc<SequenceRegistry>,
    sequence: Arc<str>,
    reload_on_request: bool,
}

impl AppState {
    pub fn new(registry: Arc<SequenceRegistry>, sequence: impl Into<Arc<str>>, reload_on_request: bool) -> Self {
        Self {
            registry,
            sequence: sequence.into(),
            reload_on_request,
        }
    }
}

/// Routes every method and path to the mediation handler.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", any(mediate))
        .route("/*path", any(mediate))
        .with_state(state)
}

/// Re-reads definitions every `interval` in the background.
pub fn spawn_reload_timer(registry: Arc<SequenceRegistry>, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            reload(&registry).await;
        }
    })
}

/// Refreshes on a blocking thread; a rejected refresh keeps the old sequences.
async fn reload(registry: &Arc<SequenceRegistry>) {
    let registry = registry.clone();
    match tokio::task::spawn_blocking(move || registry.refresh()).await {
        Ok(Ok(generation)) => debug!(generation, "definitions reloaded"),
        Ok(Err(e)) => warn!(
            source = %e.source_id,
            error = %e.message,
            "reload failed; serving previous sequences"
        ),
        Err(e) => error!(error = %e, "reload task failed"),
    }
}

async fn mediate(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if state.reload_on_request {
        reload(&state.registry).await;
    }

    let path = uri
        .path_and_query()
        .map_or_else(|| uri.path().to_string(), |pq| pq.as_str().to_string());
    let mut ctx = MessageContext::new(method.as_str(), path, flatten_headers(&headers), body.to_vec());

    if let Err(e) = state.registry.dispatch(&state.sequence, &mut ctx).await {
        error!(
            message_id = %ctx.id(),
            sequence = %state.sequence,
            error = %e,
            "mediation failed"
        );
        let status = StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (status, e.to_string()).into_response();
    }

    into_http_response(ctx)
}

fn flatten_headers(headers: &HeaderMap) -> Headers {
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

fn into_http_response(ctx: MessageContext) -> Response {
    let message_id = ctx.id();
    let (status, headers, body) = ctx.into_response();

    let status = StatusCode::from_u16(status).unwrap_or_else(|_| {
        warn!(%message_id, status, "sequence produced an invalid status; answering 502");
        StatusCode::BAD_GATEWAY
    });

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    let out = response.headers_mut();
    for (name, value) in &headers {
        if is_hop_by_hop(name) {
            continue;
        }
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                out.append(name, value);
            }
            _ => warn!(%message_id, header = %name, "dropping unrepresentable response header"),
        }
    }
    response
}
