mod handlers;
mod middleware;

pub use middleware::SharedProvider;

use std::sync::Arc;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::identity::TokenRegistry;
use crate::manager::SessionManager;

/// Router with the default identity provider. Tokens are bound to
/// identities on first use and kept for the life of the process.
pub fn create_router(manager: SessionManager) -> Router {
    create_router_with_provider(manager, Arc::new(TokenRegistry::new()))
}

pub fn create_router_with_provider(manager: SessionManager, provider: SharedProvider) -> Router {
    let api = Router::new()
        // Vocabulary
        .route("/vocabulary", get(handlers::get_vocabulary))
        // Sessions
        .route("/sessions", post(handlers::create_session))
        .route("/sessions/{id}", get(handlers::get_session))
        .route("/sessions/{id}/self", put(handlers::submit_self_assessment))
        .route("/sessions/{id}/display-name", put(handlers::rename_session))
        // Feedback
        .route("/sessions/{id}/feedback", put(handlers::submit_feedback))
        .route("/sessions/{id}/feedback", get(handlers::list_feedback))
        // Window
        .route("/sessions/{id}/window", get(handlers::get_window))
        .route("/sessions/{id}/events", get(handlers::window_events))
        // Health
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(from_fn_with_state(provider, middleware::identity_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(manager))
}
