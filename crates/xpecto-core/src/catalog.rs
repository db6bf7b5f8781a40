//! Catalog entities served through the generic [`Repository`](crate::store::Repository).
//!
//! These are plain documents with required-field validation and no further
//! behaviour.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::{Error, Result};

/// A document type stored in the catalog.
pub trait Entity:
  Serialize + DeserializeOwned + Clone + Send + Sync + 'static
{
  /// Storage discriminant, also used in error messages.
  const KIND: &'static str;

  /// Check required fields before a create or update.
  fn validate(&self) -> Result<()>;
}

/// A stored entity with its server-assigned metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record<E> {
  pub id:         Uuid,
  #[serde(flatten)]
  pub data:       E,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

fn required(kind: &str, field: &str, value: &str) -> Result<()> {
  if value.trim().is_empty() {
    Err(Error::Validation(format!("{kind}: {field} is required")))
  } else {
    Ok(())
  }
}

// ─── Session ─────────────────────────────────────────────────────────────────

/// A talk or workshop slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
  #[serde(default)]
  pub title:              String,
  #[serde(default)]
  pub description:        String,
  #[serde(rename = "club_name")]
  pub club_name:          Option<String>,
  #[serde(default)]
  pub venue:              String,
  pub start_time:         Option<String>,
  pub end_time:           Option<String>,
  /// Minutes.
  pub duration:           Option<u32>,
  pub date:               Option<DateTime<Utc>>,
  #[serde(default)]
  pub image:              Vec<String>,
  pub registration_limit: Option<u32>,
  pub company:            Option<String>,
}

impl Entity for Session {
  const KIND: &'static str = "session";

  fn validate(&self) -> Result<()> {
    required(Self::KIND, "title", &self.title)?;
    required(Self::KIND, "description", &self.description)?;
    required(Self::KIND, "venue", &self.venue)?;
    if self.date.is_none() {
      return Err(Error::Validation("session: date is required".into()));
    }
    if self.image.iter().any(|i| i.trim().is_empty()) {
      return Err(Error::Validation("session: image entries must not be empty".into()));
    }
    Ok(())
  }
}

// ─── Exhibition ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exhibition {
  #[serde(default)]
  pub title:       String,
  #[serde(default)]
  pub description: String,
  pub venue:       Option<String>,
  pub club_name:   Option<String>,
  pub date:        Option<DateTime<Utc>>,
  #[serde(default)]
  pub image:       Vec<String>,
  pub company:     Option<String>,
}

impl Entity for Exhibition {
  const KIND: &'static str = "exhibition";

  fn validate(&self) -> Result<()> {
    required(Self::KIND, "title", &self.title)?;
    required(Self::KIND, "description", &self.description)
  }
}
