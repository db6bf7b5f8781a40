//! Registration: one identity's intent to attend, with payment tracking.
//!
//! Tier and amount are fixed at creation from the pricing policy and never
//! change. Only an admin payment update mutates a registration afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{identity::Identity, pricing::Quote};

// ─── Enums ───────────────────────────────────────────────────────────────────

/// Pricing bucket, determined solely by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
  EarlyBird,
  Regular,
}

impl Tier {
  pub fn as_str(self) -> &'static str {
    match self {
      Tier::EarlyBird => "early_bird",
      Tier::Regular => "regular",
    }
  }
}

/// Admin-reported payment state.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
  #[default]
  Pending,
  Completed,
  Failed,
}

impl PaymentStatus {
  pub const ALL: [PaymentStatus; 3] =
    [PaymentStatus::Pending, PaymentStatus::Completed, PaymentStatus::Failed];

  pub fn as_str(self) -> &'static str {
    match self {
      PaymentStatus::Pending => "pending",
      PaymentStatus::Completed => "completed",
      PaymentStatus::Failed => "failed",
    }
  }

  /// Pending and completed registrations block a new one for the same owner.
  pub fn is_active(self) -> bool { !matches!(self, PaymentStatus::Failed) }
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// Contact details copied from the owning identity at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSnapshot {
  pub name:         String,
  pub email:        String,
  pub phone:        String,
  pub organization: String,
}

impl ContactSnapshot {
  pub fn of(identity: &Identity) -> Self {
    Self {
      name:         identity.name.clone(),
      email:        identity.email.clone(),
      phone:        identity.phone.clone().unwrap_or_default(),
      organization: identity.organization_name.clone().unwrap_or_default(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
  pub id:               Uuid,
  pub owner_id:         Uuid,
  #[serde(flatten)]
  pub contact:          ContactSnapshot,
  pub tier:             Tier,
  /// Minor currency units.
  pub amount:           i64,
  pub payment_status:   PaymentStatus,
  pub payment_verified: bool,
  pub transaction_id:   Option<String>,
  pub notes:            Option<String>,
  pub created_at:       DateTime<Utc>,
  pub updated_at:       DateTime<Utc>,
}

/// Input for [`RegistrationLedger::create_registration`](crate::store::RegistrationLedger::create_registration).
#[derive(Debug, Clone)]
pub struct NewRegistration {
  pub owner_id:   Uuid,
  pub contact:    ContactSnapshot,
  pub quote:      Quote,
  pub created_at: DateTime<Utc>,
}

/// Result of an idempotent registration attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationOutcome {
  Created(Registration),
  /// The owner already had an active registration; it is returned unchanged.
  Existing(Registration),
}

impl RegistrationOutcome {
  pub fn is_existing(&self) -> bool { matches!(self, Self::Existing(_)) }

  pub fn registration(&self) -> &Registration {
    match self {
      Self::Created(r) | Self::Existing(r) => r,
    }
  }

  pub fn into_registration(self) -> Registration {
    match self {
      Self::Created(r) | Self::Existing(r) => r,
    }
  }
}

/// Admin payment update. Every field is independently optional; absent
/// fields keep their stored value. No transition rules are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentUpdate {
  pub payment_status:   Option<PaymentStatus>,
  pub payment_verified: Option<bool>,
  pub transaction_id:   Option<String>,
  pub notes:            Option<String>,
}

/// Result of an admin payment update on an existing registration.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentUpdateOutcome {
  Updated(Registration),
  /// Reactivation refused: the owner already holds this active registration.
  Blocked(Registration),
}

// ─── Admin views ─────────────────────────────────────────────────────────────

/// Owner fields joined into the admin listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerSummary {
  pub name:   String,
  pub email:  String,
  pub avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationListing {
  #[serde(flatten)]
  pub registration: Registration,
  pub owner:        Option<OwnerSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBucket {
  pub status:       PaymentStatus,
  pub count:        u64,
  pub total_amount: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationStats {
  pub total_count:    u64,
  pub verified_count: u64,
  /// One bucket per status that has at least one registration.
  pub per_status:     Vec<StatusBucket>,
}

impl RegistrationStats {
  pub fn bucket(&self, status: PaymentStatus) -> Option<&StatusBucket> {
    self.per_status.iter().find(|b| b.status == status)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::identity::Role;

  fn identity() -> Identity {
    Identity {
      id:                Uuid::new_v4(),
      google_id:         None,
      email:             "a@x.com".into(),
      name:              "A".into(),
      avatar:            None,
      role:              Role::User,
      secondary_email:   None,
      organization_name: Some("Uni".into()),
      phone:             None,
      created_at:        Utc::now(),
      updated_at:        Utc::now(),
    }
  }

  #[test]
  fn snapshot_defaults_missing_fields_to_empty() {
    let snap = ContactSnapshot::of(&identity());
    assert_eq!(snap.phone, "");
    assert_eq!(snap.organization, "Uni");
  }

  #[test]
  fn failed_is_not_active() {
    assert!(PaymentStatus::Pending.is_active());
    assert!(PaymentStatus::Completed.is_active());
    assert!(!PaymentStatus::Failed.is_active());
  }

  #[test]
  fn unknown_status_is_rejected() {
    let parsed =
      serde_json::from_str::<PaymentUpdate>(r#"{"paymentStatus":"refunded"}"#);
    assert!(parsed.is_err());
  }
}
