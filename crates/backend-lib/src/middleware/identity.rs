//! Caller authentication.
//!
//! [`require_identity`] resolves the `Authorization` header through the
//! configured [`IdentityProvider`](crate::auth::IdentityProvider) and stores
//! the resulting [`Identity`] in the request extensions, where handlers pick
//! it up through [`CallerIdentity`] or [`MaybeIdentity`].
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use tracing::warn;
use tradingroom_common::Identity;

use crate::{auth::IdentityError, error::AppError, AppState};

/// Reject requests that do not carry a resolvable identity.
///
/// A missing header or an upstream 401 is 401, any other resolution
/// failure is 403.
pub async fn require_identity(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let authorization = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .ok_or(AppError::Unauthorized)?;

    let identity = state.identity.resolve(&authorization).await.map_err(|e| {
        warn!(error = %e, "identity resolution failed");
        match e {
            // the identity service's own 401 reaches the caller unchanged
            IdentityError::Rejected(401) => AppError::Unauthorized,
            other => AppError::IdentityUnavailable(other.to_string()),
        }
    })?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Identity of an authenticated caller
#[derive(Debug, Clone)]
pub struct CallerIdentity(pub Identity);

impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(CallerIdentity)
            .ok_or(AppError::Unauthorized)
    }
}

/// Identity of the caller when the route went through [`require_identity`]
#[derive(Debug, Clone)]
pub struct MaybeIdentity(pub Option<Identity>);

impl<S> FromRequestParts<S> for MaybeIdentity
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeIdentity(parts.extensions.get::<Identity>().cloned()))
    }
}
