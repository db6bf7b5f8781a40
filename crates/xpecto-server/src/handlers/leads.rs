//! Handlers for `/leads` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/leads` | Session required; 400 with `lead` if one is active |
//! | `GET`  | `/leads/my-lead` | Session required; newest registration or `null` |
//! | `GET`  | `/leads` | Admin |
//! | `GET`  | `/leads/stats` | Admin |
//! | `PUT`  | `/leads/:id` | Admin; body: any of `paymentStatus`, `paymentVerified`, `transactionId`, `notes`; 400 with `lead` if reactivation is blocked |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{Value, json};
use xpecto_core::{
  registration::{PaymentUpdate, RegistrationOutcome, RegistrationStats},
  store::{ProfileStore, RegistrationLedger},
};

use super::{Body, parse_id};
use crate::{
  AppState,
  error::ApiError,
  gate::{AdminUser, CurrentUser},
};

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /leads`
pub async fn create<S, V>(
  State(state): State<AppState<S, V>>,
  CurrentUser(identity): CurrentUser,
) -> Result<impl IntoResponse, ApiError>
where
  S: ProfileStore + RegistrationLedger + 'static,
  V: Send + Sync + 'static,
{
  match state.workflow.register(&identity, Utc::now()).await? {
    RegistrationOutcome::Created(lead) => Ok((
      StatusCode::CREATED,
      Json(json!({
        "success": true,
        "message": "Registration initiated successfully",
        "alreadyRegistered": false,
        "lead": lead,
      })),
    )),
    RegistrationOutcome::Existing(lead) => Err(ApiError::Conflict {
      message: "You already have a pending or completed registration",
      lead:    Box::new(lead),
    }),
  }
}

// ─── Read ─────────────────────────────────────────────────────────────────────

/// `GET /leads/my-lead`
pub async fn mine<S, V>(
  State(state): State<AppState<S, V>>,
  CurrentUser(identity): CurrentUser,
) -> Result<Json<Value>, ApiError>
where
  S: ProfileStore + RegistrationLedger + 'static,
  V: Send + Sync + 'static,
{
  let lead = state.workflow.latest_for(&identity).await?;
  Ok(Json(json!({ "success": true, "lead": lead })))
}

/// `GET /leads`
pub async fn list<S, V>(
  State(state): State<AppState<S, V>>,
  AdminUser(admin): AdminUser,
) -> Result<Json<Value>, ApiError>
where
  S: ProfileStore + RegistrationLedger + 'static,
  V: Send + Sync + 'static,
{
  let leads = state.workflow.list(&admin).await?;
  Ok(Json(json!({ "success": true, "count": leads.len(), "leads": leads })))
}

#[derive(Serialize)]
pub struct StatsResponse {
  pub success: bool,
  #[serde(flatten)]
  pub stats:   RegistrationStats,
}

/// `GET /leads/stats`
pub async fn stats<S, V>(
  State(state): State<AppState<S, V>>,
  AdminUser(admin): AdminUser,
) -> Result<Json<StatsResponse>, ApiError>
where
  S: ProfileStore + RegistrationLedger + 'static,
  V: Send + Sync + 'static,
{
  let stats = state.workflow.stats(&admin).await?;
  Ok(Json(StatsResponse { success: true, stats }))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PUT /leads/:id`
pub async fn update<S, V>(
  State(state): State<AppState<S, V>>,
  AdminUser(admin): AdminUser,
  Path(id): Path<String>,
  Body(update): Body<PaymentUpdate>,
) -> Result<Json<Value>, ApiError>
where
  S: ProfileStore + RegistrationLedger + 'static,
  V: Send + Sync + 'static,
{
  let id = parse_id(&id)?;
  let lead = state.workflow.update_payment_status(&admin, id, update).await?;
  Ok(Json(json!({ "success": true, "lead": lead })))
}
