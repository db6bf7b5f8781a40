//! Error types for `xpecto-auth`.

use thiserror::Error;

/// Failures while establishing an identity.
#[derive(Debug, Error)]
pub enum AuthError {
  /// The assertion was malformed, badly signed, or for the wrong audience
  /// or issuer.
  #[error("invalid identity assertion: {0}")]
  InvalidAssertion(String),

  /// The identity provider could not be reached or answered with an error.
  #[error("identity provider error: {0}")]
  Provider(String),

  #[error("identity provider timed out")]
  Timeout,

  #[error("invalid email or password")]
  InvalidCredentials,

  #[error("an account with this email already exists")]
  EmailTaken,

  #[error("invalid input: {0}")]
  Validation(String),

  /// argon2 failed server-side; never the caller's fault.
  #[error("password hashing failed: {0}")]
  Hashing(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl AuthError {
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }

  /// True for failures the caller should see as a rejected credential.
  pub fn is_rejection(&self) -> bool {
    matches!(
      self,
      Self::InvalidAssertion(_)
        | Self::Provider(_)
        | Self::Timeout
        | Self::InvalidCredentials
    )
  }
}

/// Failures while issuing or reading a session token.
#[derive(Debug, Error)]
pub enum SessionError {
  #[error("no session token presented")]
  Missing,

  #[error("session token expired")]
  Expired,

  #[error("invalid session token: {0}")]
  Invalid(#[source] jsonwebtoken::errors::Error),

  #[error("could not sign session token: {0}")]
  Signing(#[source] jsonwebtoken::errors::Error),
}

pub type Result<T, E = AuthError> = std::result::Result<T, E>;
