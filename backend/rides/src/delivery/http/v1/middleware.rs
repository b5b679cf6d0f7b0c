use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::{
    domain::session::{MaybeSession, Session},
    usecase::jwt::JwtError,
    AppState,
};

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Rejects the request unless it carries a valid access token, and hands the
/// resolved [`Session`] to the handler.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, (StatusCode, String)> {
    let Some(token) = bearer_token(request.headers()) else {
        tracing::warn!("missing or invalid authorization header");
        return Err((
            StatusCode::UNAUTHORIZED,
            "Missing or invalid Authorization header".to_string(),
        ));
    };

    let session = state.jwt_service.session_from_token(token).map_err(|e| {
        tracing::warn!(?e, "invalid token");
        match e {
            JwtError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token type".to_string()),
            other => (StatusCode::UNAUTHORIZED, format!("Invalid token: {}", other)),
        }
    })?;

    tracing::debug!(user_id = %session.user_id, "user authenticated successfully");
    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}

/// For routes usable signed out. A missing or bad token yields an anonymous
/// [`MaybeSession`] instead of a rejection.
pub async fn optional_auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let session = match bearer_token(request.headers()) {
        Some(token) => match state.jwt_service.session_from_token(token) {
            Ok(session) => {
                tracing::debug!(user_id = %session.user_id, "optional auth resolved a session");
                Some(session)
            }
            Err(e) => {
                tracing::debug!(?e, "ignoring invalid token on public route");
                None
            }
        },
        None => None,
    };

    request.extensions_mut().insert(MaybeSession(session));
    next.run(request).await
}
