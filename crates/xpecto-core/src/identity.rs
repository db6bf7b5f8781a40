//! A person known to the system.
//!
//! An identity is created on the first successful Google sign-in or on local
//! signup. Email is unique and stored lower-cased; the Google subject id is
//! unique when present. Identities are never deleted.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Authorization role. The hierarchy is flat: only exact matches count.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  #[default]
  User,
  Admin,
}

impl Role {
  pub fn as_str(self) -> &'static str {
    match self {
      Role::User => "user",
      Role::Admin => "admin",
    }
  }
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A persisted identity record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
  pub id:                Uuid,
  /// Google `sub` claim. Never exposed over the API.
  #[serde(skip_serializing, default)]
  pub google_id:         Option<String>,
  pub email:             String,
  pub name:              String,
  pub avatar:            Option<String>,
  pub role:              Role,
  pub secondary_email:   Option<String>,
  pub organization_name: Option<String>,
  pub phone:             Option<String>,
  pub created_at:        DateTime<Utc>,
  pub updated_at:        DateTime<Utc>,
}

/// Input for [`ProfileStore::create_identity`](crate::store::ProfileStore::create_identity).
#[derive(Debug, Clone)]
pub struct NewIdentity {
  pub google_id:     Option<String>,
  /// Must already be normalised with [`normalize_email`].
  pub email:         String,
  pub name:          String,
  pub avatar:        Option<String>,
  pub role:          Role,
  /// argon2 PHC string for local accounts.
  pub password_hash: Option<String>,
}

/// Fields a signed-in identity supplies to complete its profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileCompletion {
  pub secondary_email:   String,
  pub organization_name: String,
  pub phone:             String,
}

impl ProfileCompletion {
  /// Trim and validate the three completion fields. All are required; a
  /// blank value counts as missing.
  pub fn new(
    secondary_email: Option<&str>,
    organization_name: Option<&str>,
    phone: Option<&str>,
  ) -> Result<Self> {
    let present = |v: Option<&str>| {
      v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned)
    };
    match (
      present(secondary_email),
      present(organization_name),
      present(phone),
    ) {
      (Some(email), Some(organization_name), Some(phone)) => Ok(Self {
        secondary_email: email.to_lowercase(),
        organization_name,
        phone,
      }),
      _ => Err(Error::Validation(
        "secondary email, organization name, and phone are required".into(),
      )),
    }
  }
}

/// Trim and lower-case an email address.
pub fn normalize_email(email: &str) -> String { email.trim().to_lowercase() }

/// The part of `email` before `@`, used as a fallback display name.
pub fn email_local_part(email: &str) -> &str {
  email.split_once('@').map_or(email, |(local, _)| local)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn normalizes_email() {
    assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
  }

  #[test]
  fn local_part_falls_back_to_whole_string() {
    assert_eq!(email_local_part("a@x.com"), "a");
    assert_eq!(email_local_part("no-at-sign"), "no-at-sign");
  }

  #[test]
  fn completion_requires_all_fields() {
    let err = ProfileCompletion::new(Some("b@uni.edu"), Some("   "), Some("123"))
      .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    assert!(ProfileCompletion::new(None, Some("Uni"), Some("123")).is_err());
  }

  #[test]
  fn completion_trims_and_lowercases() {
    let c = ProfileCompletion::new(
      Some(" B@Uni.EDU "),
      Some(" IIT Mandi "),
      Some(" 98765 "),
    )
    .unwrap();
    assert_eq!(c.secondary_email, "b@uni.edu");
    assert_eq!(c.organization_name, "IIT Mandi");
    assert_eq!(c.phone, "98765");
  }

  #[test]
  fn role_serializes_lowercase() {
    assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
    assert_eq!(Role::default(), Role::User);
  }
}
