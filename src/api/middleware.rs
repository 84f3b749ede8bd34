//! Identity middleware attaching the resolved caller to every request.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};

use crate::identity::IdentityProvider;

pub type SharedProvider = Arc<dyn IdentityProvider>;

/// Resolve the caller and expose the identity as a request extension.
///
/// Requests are never rejected here. A missing or non-bearer Authorization
/// header resolves to a fresh anonymous identity, which is all an exercise
/// participant needs.
pub async fn identity_middleware(
    State(provider): State<SharedProvider>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let identity = provider.resolve(bearer_token(request.headers()));
    request.extensions_mut().insert(identity);
    next.run(request).await
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
}
