//! Pass-through forwarding of `/api/proxy/*` to the backend service.

use crate::error::ProxyError;
use crate::state::AppState;
use axum::body::{Body, HttpBody};
use axum::extract::State;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    CONTENT_LENGTH, CONTENT_TYPE,
};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

const DEFAULT_CONTENT_TYPE: &str = "application/json";

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/{*path}", get(forward).post(forward).options(preflight))
        .with_state(state)
}

/// Join the backend base URL with a request path and optional query string.
///
/// Exactly one `/` separates the two halves no matter how either is written.
pub fn join_url(base: &str, path: &str, query: Option<&str>) -> String {
    let mut url = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        url.push('?');
        url.push_str(query);
    }
    url
}

/// Stream the request to the backend and its answer back, both unchanged.
///
/// Only the content type and body length travel upstream. Credentials and
/// cookies stay here.
#[tracing::instrument(skip(state, headers, body), fields(path = %uri.path()))]
async fn forward(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Body,
) -> Result<Response, ProxyError> {
    let target = join_url(&state.config.proxy.backend_url, uri.path(), uri.query());
    let content_type = headers
        .get(CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));

    tracing::debug!("Forwarding {} to {}", method, target);

    let mut request = state
        .http
        .request(method.clone(), &target)
        .header(CONTENT_TYPE, content_type);
    if method != Method::GET && method != Method::HEAD {
        // Keep a known length so the upload is not sent chunked.
        if let Some(length) = body.size_hint().exact() {
            request = request.header(CONTENT_LENGTH, length);
        }
        request = request.body(reqwest::Body::wrap_stream(body.into_data_stream()));
    }

    let upstream = request.send().await?;
    let status = upstream.status();
    tracing::debug!("Backend answered {} for {}", status, target);

    let mut response = Response::builder().status(status);
    if let Some(content_type) = upstream.headers().get(CONTENT_TYPE) {
        response = response.header(CONTENT_TYPE, content_type.clone());
    }
    Ok(response.body(Body::from_stream(upstream.bytes_stream()))?)
}

async fn preflight() -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [
            (ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (ACCESS_CONTROL_ALLOW_METHODS, "GET,POST,OPTIONS"),
            (ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type, Authorization"),
        ],
    )
}
