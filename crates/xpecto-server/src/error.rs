//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every failure leaves the server as `{"success": false, "message": ...}`.
//! Internal errors are logged here and never shown to the caller.

use axum::{
  Json,
  extract::rejection::JsonRejection,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use xpecto_auth::{AuthError, SessionError};
use xpecto_core::{Error as CoreError, registration::Registration};

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  Validation(String),

  #[error("unauthorized: {0}")]
  AuthInvalid(String),

  #[error("forbidden")]
  Forbidden,

  #[error("not found: {0}")]
  NotFound(String),

  /// An active registration blocks the request; it rides along in the body.
  #[error("conflict: {message}")]
  Conflict {
    message: &'static str,
    lead:    Box<Registration>,
  },

  #[error("internal error: {0}")]
  Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn internal(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Internal(Box::new(e))
  }

  fn status(&self) -> StatusCode {
    match self {
      ApiError::Validation(_) | ApiError::Conflict { .. } => {
        StatusCode::BAD_REQUEST
      }
      ApiError::AuthInvalid(_) => StatusCode::UNAUTHORIZED,
      ApiError::Forbidden => StatusCode::FORBIDDEN,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let body = match self {
      ApiError::Validation(m) | ApiError::AuthInvalid(m) | ApiError::NotFound(m) => {
        json!({ "success": false, "message": m })
      }
      ApiError::Forbidden => {
        json!({ "success": false, "message": "Access denied: admin only" })
      }
      ApiError::Conflict { message, lead } => json!({
        "success": false,
        "message": message,
        "alreadyRegistered": true,
        "lead": lead,
      }),
      ApiError::Internal(e) => {
        tracing::error!(error = %e, "request failed");
        json!({ "success": false, "message": "Internal server error" })
      }
    };
    (status, Json(body)).into_response()
  }
}

// ─── Conversions ─────────────────────────────────────────────────────────────

impl From<CoreError> for ApiError {
  fn from(e: CoreError) -> Self {
    match e {
      CoreError::Forbidden { .. } => ApiError::Forbidden,
      CoreError::RegistrationNotFound(_) => ApiError::NotFound("Lead not found".into()),
      CoreError::ActiveRegistrationExists(lead) => ApiError::Conflict {
        message: "Owner already has a pending or completed registration",
        lead,
      },
      CoreError::Validation(m) => ApiError::Validation(m),
      CoreError::Store(e) => ApiError::Internal(e),
    }
  }
}

impl From<AuthError> for ApiError {
  fn from(e: AuthError) -> Self {
    match e {
      AuthError::InvalidCredentials => {
        ApiError::AuthInvalid("Invalid email or password".into())
      }
      e if e.is_rejection() => {
        tracing::debug!(error = %e, "identity assertion rejected");
        ApiError::AuthInvalid("Invalid Google ID token".into())
      }
      AuthError::EmailTaken => ApiError::Validation("User already exists".into()),
      AuthError::Validation(m) => ApiError::Validation(m),
      other => ApiError::internal(other),
    }
  }
}

impl From<SessionError> for ApiError {
  fn from(e: SessionError) -> Self {
    match e {
      SessionError::Missing => ApiError::AuthInvalid("Not authenticated".into()),
      SessionError::Signing(e) => ApiError::internal(e),
      other => {
        tracing::debug!(error = %other, "session rejected");
        ApiError::AuthInvalid("Invalid or expired session".into())
      }
    }
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    ApiError::Validation(rejection.body_text())
  }
}
