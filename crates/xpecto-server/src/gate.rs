//! Session-cookie authentication and role gating.
//!
//! [`CurrentUser`] and [`AdminUser`] are axum extractors; a handler that
//! takes one only runs for a caller holding a live session (and, for
//! `AdminUser`, the admin role).

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use chrono::Utc;
use xpecto_auth::session::{COOKIE_NAME, find_cookie};
use xpecto_core::{
  access::require_role,
  identity::{Identity, Role},
  store::ProfileStore,
};

use crate::{AppState, error::ApiError};

/// The session token from the request's `Cookie` headers, if any.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
  headers
    .get_all(header::COOKIE)
    .iter()
    .filter_map(|value| value.to_str().ok())
    .find_map(|cookies| find_cookie(cookies, COOKIE_NAME))
}

/// Resolve the caller's identity from their session cookie.
///
/// Fails with [`ApiError::AuthInvalid`] when the token is missing, forged or
/// expired, or names an identity that no longer exists.
pub async fn authenticate<S, V>(
  headers: &HeaderMap,
  state: &AppState<S, V>,
) -> Result<Identity, ApiError>
where
  S: ProfileStore,
{
  let claims = state.sessions.parse(session_token(headers), Utc::now())?;

  state
    .store
    .get_identity(claims.id)
    .await
    .map_err(ApiError::internal)?
    .ok_or_else(|| ApiError::AuthInvalid("User no longer exists".into()))
}

/// Any signed-in identity.
pub struct CurrentUser(pub Identity);

impl<S, V> FromRequestParts<AppState<S, V>> for CurrentUser
where
  S: ProfileStore + 'static,
  V: Send + Sync + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, V>,
  ) -> Result<Self, Self::Rejection> {
    authenticate(&parts.headers, state).await.map(CurrentUser)
  }
}

/// A signed-in identity holding [`Role::Admin`].
pub struct AdminUser(pub Identity);

impl<S, V> FromRequestParts<AppState<S, V>> for AdminUser
where
  S: ProfileStore + 'static,
  V: Send + Sync + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, V>,
  ) -> Result<Self, Self::Rejection> {
    let identity = authenticate(&parts.headers, state).await?;
    require_role(&identity, Role::Admin)?;
    Ok(AdminUser(identity))
  }
}
