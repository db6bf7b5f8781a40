//! Handlers for `/auth` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/auth/google-onetap` | Body: `{"id_token":"…"}`; sets the session cookie |
//! | `GET`  | `/auth/google` | Redirects to Google's consent screen |
//! | `GET`  | `/auth/google/callback` | `?code=…`; redirects to the frontend |
//! | `POST` | `/auth/register` | Body: `{"name","email","password"}` |
//! | `POST` | `/auth/login` | Body: `{"email","password"}` |
//! | `GET`  | `/auth/me` | Session required |
//! | `PUT`  | `/auth/complete-profile` | Session required |
//! | `POST` | `/auth/logout` | Clears the session cookie |

use axum::{
  Json,
  extract::{Query, State},
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;
use xpecto_auth::IdTokenVerifier;
use xpecto_core::{
  identity::{Identity, ProfileCompletion, Role},
  store::ProfileStore,
};

use super::Body;
use crate::{AppState, error::ApiError, gate::CurrentUser};

// ─── Shared ───────────────────────────────────────────────────────────────────

/// The profile fields returned to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
  pub id:                Uuid,
  pub name:              String,
  pub email:             String,
  pub avatar:            Option<String>,
  pub role:              Role,
  pub secondary_email:   Option<String>,
  pub organization_name: Option<String>,
  pub phone:             Option<String>,
}

impl From<&Identity> for UserView {
  fn from(identity: &Identity) -> Self {
    Self {
      id:                identity.id,
      name:              identity.name.clone(),
      email:             identity.email.clone(),
      avatar:            identity.avatar.clone(),
      role:              identity.role,
      secondary_email:   identity.secondary_email.clone(),
      organization_name: identity.organization_name.clone(),
      phone:             identity.phone.clone(),
    }
  }
}

fn session_cookie<S, V>(
  state: &AppState<S, V>,
  identity: &Identity,
) -> Result<HeaderValue, ApiError> {
  let token = state.sessions.issue(identity, Utc::now())?;
  HeaderValue::from_str(&state.sessions.cookie().set_cookie(&token))
    .map_err(ApiError::internal)
}

/// JSON body plus a fresh session cookie for `identity`.
fn signed_in<S, V>(
  state: &AppState<S, V>,
  identity: &Identity,
  status: StatusCode,
  message: &str,
) -> Result<Response, ApiError> {
  let cookie = session_cookie(state, identity)?;
  let body = json!({
    "success": true,
    "message": message,
    "user": UserView::from(identity),
  });
  Ok((status, [(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

// ─── Google ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct OneTapRequest {
  #[serde(default)]
  pub id_token: Option<String>,
}

/// `POST /auth/google-onetap`
pub async fn google_one_tap<S, V>(
  State(state): State<AppState<S, V>>,
  Body(req): Body<OneTapRequest>,
) -> Result<Response, ApiError>
where
  S: ProfileStore + 'static,
  V: IdTokenVerifier + 'static,
{
  let id_token = req
    .id_token
    .filter(|t| !t.trim().is_empty())
    .ok_or_else(|| ApiError::Validation("id_token is required".into()))?;

  let identity = state.resolver.resolve(&id_token).await?;
  tracing::info!(identity = %identity.id, "signed in with google one tap");
  signed_in(&state, &identity, StatusCode::OK, "Signed in successfully")
}

/// `GET /auth/google`
pub async fn google_start<S, V>(State(state): State<AppState<S, V>>) -> Redirect
where
  S: ProfileStore + 'static,
  V: IdTokenVerifier + 'static,
{
  Redirect::to(&state.resolver.verifier().authorization_url())
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
  pub code:  Option<String>,
  pub error: Option<String>,
}

/// `GET /auth/google/callback?code=…`
///
/// Always answers with a redirect to the frontend; failures carry no body.
pub async fn google_callback<S, V>(
  State(state): State<AppState<S, V>>,
  Query(params): Query<CallbackParams>,
) -> Response
where
  S: ProfileStore + 'static,
  V: IdTokenVerifier + 'static,
{
  let failure = Redirect::to(&state.config.frontend_redirect("error"));

  if let Some(error) = params.error {
    tracing::debug!(%error, "google reported an authorization error");
    return failure.into_response();
  }
  let Some(code) = params.code.filter(|c| !c.is_empty()) else {
    return failure.into_response();
  };

  let attempt = async {
    let identity = state.resolver.resolve_code(&code).await?;
    let cookie = session_cookie(&state, &identity)?;
    Ok::<_, ApiError>((identity, cookie))
  };

  match attempt.await {
    Ok((identity, cookie)) => {
      tracing::info!(identity = %identity.id, "signed in with google redirect");
      let success = Redirect::to(&state.config.frontend_redirect("success"));
      ([(header::SET_COOKIE, cookie)], success).into_response()
    }
    Err(e) => {
      tracing::warn!(error = %e, "google callback failed");
      failure.into_response()
    }
  }
}

// ─── Local accounts ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
  #[serde(default)]
  pub name:     String,
  #[serde(default)]
  pub email:    String,
  #[serde(default)]
  pub password: String,
}

/// `POST /auth/register`
pub async fn register<S, V>(
  State(state): State<AppState<S, V>>,
  Body(req): Body<RegisterRequest>,
) -> Result<Response, ApiError>
where
  S: ProfileStore + 'static,
  V: IdTokenVerifier + 'static,
{
  let identity = state
    .resolver
    .signup_local(&req.name, &req.email, &req.password)
    .await?;
  signed_in(&state, &identity, StatusCode::CREATED, "Registered successfully")
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
  #[serde(default)]
  pub email:    String,
  #[serde(default)]
  pub password: String,
}

/// `POST /auth/login`
pub async fn login<S, V>(
  State(state): State<AppState<S, V>>,
  Body(req): Body<LoginRequest>,
) -> Result<Response, ApiError>
where
  S: ProfileStore + 'static,
  V: IdTokenVerifier + 'static,
{
  let identity = state.resolver.login_local(&req.email, &req.password).await?;
  signed_in(&state, &identity, StatusCode::OK, "Logged in successfully")
}

// ─── Profile ──────────────────────────────────────────────────────────────────

/// `GET /auth/me`
pub async fn me(CurrentUser(identity): CurrentUser) -> Json<Value> {
  Json(json!({ "success": true, "user": UserView::from(&identity) }))
}

/// Accepts both the current field names and the older `college*` ones.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteProfileRequest {
  #[serde(alias = "collegeEmail")]
  pub secondary_email:   Option<String>,
  #[serde(alias = "collegeName")]
  pub organization_name: Option<String>,
  #[serde(alias = "contactNumber")]
  pub phone:             Option<String>,
}

/// `PUT /auth/complete-profile`
pub async fn complete_profile<S, V>(
  State(state): State<AppState<S, V>>,
  CurrentUser(identity): CurrentUser,
  Body(req): Body<CompleteProfileRequest>,
) -> Result<Json<Value>, ApiError>
where
  S: ProfileStore + 'static,
  V: Send + Sync + 'static,
{
  let completion = ProfileCompletion::new(
    req.secondary_email.as_deref(),
    req.organization_name.as_deref(),
    req.phone.as_deref(),
  )?;

  let saved = state
    .store
    .complete_profile(identity.id, &completion)
    .await
    .map_err(ApiError::internal)?
    .ok_or_else(|| ApiError::AuthInvalid("User no longer exists".into()))?;

  tracing::info!(identity = %saved.id, "profile completed");
  Ok(Json(json!({
    "success": true,
    "message": "Profile completed successfully",
    "user": UserView::from(&saved),
  })))
}

/// `POST /auth/logout`
pub async fn logout<S, V>(State(state): State<AppState<S, V>>) -> Response
where
  S: Send + Sync + 'static,
  V: Send + Sync + 'static,
{
  match HeaderValue::from_str(&state.sessions.cookie().clear_cookie()) {
    Ok(cookie) => (
      [(header::SET_COOKIE, cookie)],
      Json(json!({ "success": true, "message": "Logged out successfully" })),
    )
      .into_response(),
    Err(e) => {
      tracing::error!(error = %e, "could not build logout cookie");
      (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "success": false, "message": "Error logging out" })),
      )
        .into_response()
    }
  }
}
