//! Auth Gate middleware for protected route groups.

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

use crate::errors::AppError;
use crate::models::AuthContext;
use crate::state::AppState;

/// Extracts the token from an `Authorization: Bearer <token>` header.
pub fn bearer_credential(headers: &HeaderMap) -> Option<&str> {
    let auth_header = headers.get("authorization")?.to_str().ok()?;
    let parts: Vec<&str> = auth_header.split_whitespace().collect();
    match parts.as_slice() {
        [scheme, token] if scheme.eq_ignore_ascii_case("Bearer") => Some(*token),
        _ => None,
    }
}

/// Resolves the request's bearer credential into an [`AuthContext`].
pub async fn authenticate(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<AuthContext, AppError> {
    let Some(credential) = bearer_credential(headers) else {
        debug!("Missing or malformed Authorization header");
        return Err(AppError::Unauthorized);
    };

    state.validator.validate(credential).await.map_err(|e| {
        debug!(
            "Validator '{}' rejected credential: {}",
            state.validator.get_name(),
            e
        );
        AppError::Unauthorized
    })
}

/// Validates the bearer credential and attaches an [`AuthContext`] before the
/// protected handler runs. Any failure short-circuits with `Unauthorized`.
///
/// Install with `route_layer` so that only matched routes of the group are gated.
pub async fn auth_gate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let context = authenticate(&state, request.headers()).await?;
    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}
