use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

use crate::{models::Identity, startup::AppState};

/// Authentication gate: verifies the bearer token and attaches the caller's
/// [`Identity`] to the request. Rejects with 401 before anything downstream
/// runs.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = {
        let token = bearer_token(req.headers()).map_err(|e| {
            tracing::warn!(path = %req.uri().path(), reason = %e, "Rejected unauthenticated request");
            e
        })?;

        state.jwt.validate_access_token(token).map_err(|e| {
            tracing::warn!(path = %req.uri().path(), reason = %e, "Rejected invalid token");
            e
        })?
    };

    let identity = Identity::from(claims);
    tracing::Span::current().record("subject", identity.subject.as_str());

    // Store the identity in request extensions so gates and handlers can read it
    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Missing Authorization header")))?
        .to_str()
        .map_err(|_| AppError::Unauthorized(anyhow::anyhow!("Malformed Authorization header")))?;

    let (scheme, token) = value.split_once(' ').ok_or_else(|| {
        AppError::Unauthorized(anyhow::anyhow!("Malformed Authorization header"))
    })?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AppError::Unauthorized(anyhow::anyhow!(
            "Authorization scheme must be Bearer"
        )));
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::Unauthorized(anyhow::anyhow!("Empty bearer token")));
    }

    Ok(token)
}

/// Extractor for the identity attached by [`auth_middleware`].
pub struct AuthUser(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = parts.extensions.get::<Identity>().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "Identity missing from request extensions"
            ))
        })?;

        Ok(AuthUser(identity.clone()))
    }
}
