//! Error types for `xpecto-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::{identity::Role, registration::Registration};

#[derive(Debug, Error)]
pub enum Error {
  #[error("identity {identity} does not hold the {required} role")]
  Forbidden { identity: Uuid, required: Role },

  #[error("registration not found: {0}")]
  RegistrationNotFound(Uuid),

  /// The update would give an owner a second active registration; carries
  /// the one that is already active.
  #[error("owner already has active registration {}", .0.id)]
  ActiveRegistrationExists(Box<Registration>),

  #[error("invalid input: {0}")]
  Validation(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error.
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
