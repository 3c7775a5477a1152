pub mod health;
pub mod mcp;
pub mod rpc;

use axum::http::{HeaderName, HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use bc_domain::config::CorsConfig;
use bc_protocol::SESSION_HEADER;

use crate::state::AppState;

/// Build the API routes: the MCP endpoint (path from config) and `/health`.
pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            &state.config.server.endpoint_path,
            get(mcp::handle_get)
                .post(mcp::handle_post)
                .delete(mcp::handle_delete),
        )
        .route("/health", get(health::health))
}

/// The full application: routes plus CORS, concurrency limit and request
/// tracing, with state attached.
pub fn app(state: AppState) -> Router {
    let server = &state.config.server;
    let max_concurrent = server.max_concurrent_requests.max(1);
    tracing::info!(max_concurrent, "concurrency limit set");

    router(&state)
        .layer(build_cors_layer(&server.cors))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_concurrent))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build a [`CorsLayer`] from the configured allowed origins.
///
/// Origins may end in `:*` to match any port on that host
/// (e.g. `http://localhost:*`). A lone `"*"` allows every origin.
pub fn build_cors_layer(cors: &CorsConfig) -> CorsLayer {
    let session_header = HeaderName::from_static(SESSION_HEADER);
    let methods = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];
    let allow_headers = [
        axum::http::header::CONTENT_TYPE,
        axum::http::header::ACCEPT,
        session_header.clone(),
    ];

    if cors.allowed_origins.len() == 1 && cors.allowed_origins[0] == "*" {
        tracing::warn!("CORS configured with wildcard \"*\"; all origins allowed");
        return CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods(methods)
            .allow_headers(allow_headers)
            .expose_headers([session_header]);
    }

    let mut exact: Vec<HeaderValue> = Vec::new();
    let mut wildcard_prefixes: Vec<String> = Vec::new();

    for origin in &cors.allowed_origins {
        if origin.ends_with(":*") {
            wildcard_prefixes.push(origin.trim_end_matches('*').to_owned());
        } else if let Ok(hv) = origin.parse::<HeaderValue>() {
            exact.push(hv);
        } else {
            tracing::warn!(origin = %origin, "invalid CORS origin, skipping");
        }
    }

    let allow_origin = if wildcard_prefixes.is_empty() {
        AllowOrigin::list(exact)
    } else {
        AllowOrigin::predicate(move |origin, _| {
            if exact.iter().any(|e| e.as_bytes() == origin.as_bytes()) {
                return true;
            }
            let origin_str = origin.to_str().unwrap_or("");
            wildcard_prefixes.iter().any(|prefix| {
                origin_str
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|port| !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()))
            })
        })
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(methods)
        .allow_headers(allow_headers)
        .expose_headers([session_header])
}
