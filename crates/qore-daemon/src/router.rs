//! API router: wires every route to its handler and auth/rate-limit layers
//! (spec.md §4.5 "Routes").

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::{health_guard, rate_limit, require_api_key, require_proxy_api_key};
use crate::state::AppState;

/// Build the full application router. Each route carries only the layers
/// spec.md §4.5 assigns it; body-size enforcement is done by hand inside
/// the handlers (see [`crate::body`]), so axum's default limit is disabled.
pub fn create_router(state: AppState) -> Router {
    let health_route = Router::new()
        .route("/health", get(handlers::health))
        .layer(middleware::from_fn_with_state(state.clone(), health_guard));

    let policy_version_route = Router::new()
        .route("/policy/version", get(handlers::policy_version))
        .layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    let evaluate_route = Router::new()
        .route("/evaluate", post(handlers::evaluate))
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    let ql_validate_route = Router::new()
        .route("/ql-validate", post(handlers::ql_validate))
        .layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    // The proxy route verifies the signed-actor proof itself (it needs the
    // raw body to do so); the API-key guard here is the coarser
    // `QORE_PROXY_API_KEY` gate spec.md §4.5 layers in front of it.
    let zo_ask_route = Router::new()
        .route("/zo/ask", post(handlers::zo_ask))
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .layer(middleware::from_fn_with_state(state.clone(), require_proxy_api_key));

    Router::new()
        .merge(health_route)
        .merge(policy_version_route)
        .merge(evaluate_route)
        .merge(ql_validate_route)
        .merge(zo_ask_route)
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state)
}
