//! Generic CRUD handlers for catalog entities, instantiated once per
//! [`Entity`] type in the router.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde_json::{Value, json};
use xpecto_core::{catalog::Entity, store::Repository};

use super::{Body, parse_id};
use crate::{AppState, error::ApiError};

fn not_found() -> ApiError { ApiError::NotFound("Not found".into()) }

/// `POST /<kind>s`
pub async fn create<S, V, E>(
  State(state): State<AppState<S, V>>,
  Body(data): Body<E>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Repository<E> + 'static,
  V: Send + Sync + 'static,
  E: Entity,
{
  data.validate()?;
  let record = state.store.create(data).await.map_err(ApiError::internal)?;
  tracing::info!(kind = E::KIND, id = %record.id, "catalog entry created");
  Ok((StatusCode::CREATED, Json(json!({ "success": true, "data": record }))))
}

/// `GET /<kind>s`, newest first.
pub async fn list<S, V, E>(
  State(state): State<AppState<S, V>>,
) -> Result<Json<Value>, ApiError>
where
  S: Repository<E> + 'static,
  V: Send + Sync + 'static,
  E: Entity,
{
  let records = state.store.list().await.map_err(ApiError::internal)?;
  Ok(Json(json!({ "success": true, "data": records })))
}

/// `GET /<kind>s/:id`
pub async fn get_one<S, V, E>(
  State(state): State<AppState<S, V>>,
  Path(id): Path<String>,
) -> Result<Json<Value>, ApiError>
where
  S: Repository<E> + 'static,
  V: Send + Sync + 'static,
  E: Entity,
{
  let id = parse_id(&id)?;
  let record = state
    .store
    .get(id)
    .await
    .map_err(ApiError::internal)?
    .ok_or_else(not_found)?;
  Ok(Json(json!({ "success": true, "data": record })))
}

/// `PUT /<kind>s/:id`, replacing the whole document.
pub async fn update<S, V, E>(
  State(state): State<AppState<S, V>>,
  Path(id): Path<String>,
  Body(data): Body<E>,
) -> Result<Json<Value>, ApiError>
where
  S: Repository<E> + 'static,
  V: Send + Sync + 'static,
  E: Entity,
{
  let id = parse_id(&id)?;
  data.validate()?;
  let record = state
    .store
    .update(id, data)
    .await
    .map_err(ApiError::internal)?
    .ok_or_else(not_found)?;
  Ok(Json(json!({ "success": true, "data": record })))
}

/// `DELETE /<kind>s/:id`
pub async fn remove<S, V, E>(
  State(state): State<AppState<S, V>>,
  Path(id): Path<String>,
) -> Result<Json<Value>, ApiError>
where
  S: Repository<E> + 'static,
  V: Send + Sync + 'static,
  E: Entity,
{
  let id = parse_id(&id)?;
  if !state.store.delete(id).await.map_err(ApiError::internal)? {
    return Err(not_found());
  }
  tracing::info!(kind = E::KIND, %id, "catalog entry deleted");
  Ok(Json(json!({ "success": true, "message": "Deleted successfully" })))
}
