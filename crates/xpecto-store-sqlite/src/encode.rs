//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (nanoseconds, `Z`)
//! so that lexical order equals chronological order. UUIDs are stored as
//! hyphenated lowercase strings. Enums use their serde names.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Row;
use uuid::Uuid;
use xpecto_core::{
  catalog::{Entity, Record},
  identity::{Identity, Role},
  registration::{
    ContactSnapshot, OwnerSummary, PaymentStatus, Registration,
    RegistrationListing, Tier,
  },
};

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn decode_role(s: &str) -> Result<Role> {
  match s {
    "user" => Ok(Role::User),
    "admin" => Ok(Role::Admin),
    other => Err(Error::UnknownValue { column: "role", value: other.into() }),
  }
}

pub fn decode_tier(s: &str) -> Result<Tier> {
  match s {
    "early_bird" => Ok(Tier::EarlyBird),
    "regular" => Ok(Tier::Regular),
    other => Err(Error::UnknownValue { column: "tier", value: other.into() }),
  }
}

pub fn decode_status(s: &str) -> Result<PaymentStatus> {
  PaymentStatus::ALL
    .into_iter()
    .find(|status| status.as_str() == s)
    .ok_or_else(|| Error::UnknownValue {
      column: "payment_status",
      value:  s.into(),
    })
}

// ─── Identities ──────────────────────────────────────────────────────────────

pub const IDENTITY_COLUMNS: &str = "identity_id, google_id, email, name, \
  avatar, role, secondary_email, organization_name, phone, created_at, \
  updated_at";

/// Raw strings read directly from an `identities` row.
pub struct RawIdentity {
  pub identity_id:       String,
  pub google_id:         Option<String>,
  pub email:             String,
  pub name:              String,
  pub avatar:            Option<String>,
  pub role:              String,
  pub secondary_email:   Option<String>,
  pub organization_name: Option<String>,
  pub phone:             Option<String>,
  pub created_at:        String,
  pub updated_at:        String,
}

impl RawIdentity {
  /// Read a row selected with [`IDENTITY_COLUMNS`].
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      identity_id:       row.get(0)?,
      google_id:         row.get(1)?,
      email:             row.get(2)?,
      name:              row.get(3)?,
      avatar:            row.get(4)?,
      role:              row.get(5)?,
      secondary_email:   row.get(6)?,
      organization_name: row.get(7)?,
      phone:             row.get(8)?,
      created_at:        row.get(9)?,
      updated_at:        row.get(10)?,
    })
  }

  pub fn into_identity(self) -> Result<Identity> {
    Ok(Identity {
      id:                decode_uuid(&self.identity_id)?,
      google_id:         self.google_id,
      email:             self.email,
      name:              self.name,
      avatar:            self.avatar,
      role:              decode_role(&self.role)?,
      secondary_email:   self.secondary_email,
      organization_name: self.organization_name,
      phone:             self.phone,
      created_at:        decode_dt(&self.created_at)?,
      updated_at:        decode_dt(&self.updated_at)?,
    })
  }
}

// ─── Registrations ───────────────────────────────────────────────────────────

pub const REGISTRATION_COLUMNS: &str = "r.registration_id, r.owner_id, \
  r.name, r.email, r.phone, r.organization, r.tier, r.amount, \
  r.payment_status, r.payment_verified, r.transaction_id, r.notes, \
  r.created_at, r.updated_at";

/// Raw values read directly from a `registrations` row.
pub struct RawRegistration {
  pub registration_id:  String,
  pub owner_id:         String,
  pub name:             String,
  pub email:            String,
  pub phone:            String,
  pub organization:     String,
  pub tier:             String,
  pub amount:           i64,
  pub payment_status:   String,
  pub payment_verified: bool,
  pub transaction_id:   Option<String>,
  pub notes:            Option<String>,
  pub created_at:       String,
  pub updated_at:       String,
}

impl RawRegistration {
  /// Read a row selected with [`REGISTRATION_COLUMNS`] (table alias `r`).
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      registration_id:  row.get(0)?,
      owner_id:         row.get(1)?,
      name:             row.get(2)?,
      email:            row.get(3)?,
      phone:            row.get(4)?,
      organization:     row.get(5)?,
      tier:             row.get(6)?,
      amount:           row.get(7)?,
      payment_status:   row.get(8)?,
      payment_verified: row.get(9)?,
      transaction_id:   row.get(10)?,
      notes:            row.get(11)?,
      created_at:       row.get(12)?,
      updated_at:       row.get(13)?,
    })
  }

  pub fn into_registration(self) -> Result<Registration> {
    Ok(Registration {
      id:               decode_uuid(&self.registration_id)?,
      owner_id:         decode_uuid(&self.owner_id)?,
      contact:          ContactSnapshot {
        name:         self.name,
        email:        self.email,
        phone:        self.phone,
        organization: self.organization,
      },
      tier:             decode_tier(&self.tier)?,
      amount:           self.amount,
      payment_status:   decode_status(&self.payment_status)?,
      payment_verified: self.payment_verified,
      transaction_id:   self.transaction_id,
      notes:            self.notes,
      created_at:       decode_dt(&self.created_at)?,
      updated_at:       decode_dt(&self.updated_at)?,
    })
  }
}

/// A registration row joined with its owner's display fields.
pub struct RawListing {
  pub registration: RawRegistration,
  pub owner_name:   Option<String>,
  pub owner_email:  Option<String>,
  pub owner_avatar: Option<String>,
}

impl RawListing {
  /// Expects [`REGISTRATION_COLUMNS`] followed by `i.name, i.email, i.avatar`.
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      registration: RawRegistration::from_row(row)?,
      owner_name:   row.get(14)?,
      owner_email:  row.get(15)?,
      owner_avatar: row.get(16)?,
    })
  }

  pub fn into_listing(self) -> Result<RegistrationListing> {
    let owner = match (self.owner_name, self.owner_email) {
      (Some(name), Some(email)) => Some(OwnerSummary {
        name,
        email,
        avatar: self.owner_avatar,
      }),
      _ => None,
    };
    Ok(RegistrationListing {
      registration: self.registration.into_registration()?,
      owner,
    })
  }
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

/// Raw strings read directly from a `catalog` row.
pub struct RawRecord {
  pub entity_id:  String,
  pub body_json:  String,
  pub created_at: String,
  pub updated_at: String,
}

impl RawRecord {
  /// Expects `entity_id, body_json, created_at, updated_at`.
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      entity_id:  row.get(0)?,
      body_json:  row.get(1)?,
      created_at: row.get(2)?,
      updated_at: row.get(3)?,
    })
  }

  pub fn into_record<E: Entity>(self) -> Result<Record<E>> {
    Ok(Record {
      id:         decode_uuid(&self.entity_id)?,
      data:       serde_json::from_str(&self.body_json)?,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn timestamps_sort_lexically() {
    let early = DateTime::parse_from_rfc3339("2026-01-10T10:00:00.5Z")
      .unwrap()
      .with_timezone(&Utc);
    let late = DateTime::parse_from_rfc3339("2026-01-10T10:00:01Z")
      .unwrap()
      .with_timezone(&Utc);
    assert!(encode_dt(early) < encode_dt(late));
    assert_eq!(decode_dt(&encode_dt(early)).unwrap(), early);
  }

  #[test]
  fn unknown_status_is_an_error() {
    assert!(matches!(
      decode_status("refunded"),
      Err(Error::UnknownValue { column: "payment_status", .. })
    ));
    assert_eq!(decode_status("failed").unwrap(), PaymentStatus::Failed);
  }
}
