//! Registration lifecycle: idempotent creation and admin payment updates.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  Error, Result,
  access::require_role,
  identity::{Identity, Role},
  pricing::PricingPolicy,
  registration::{
    ContactSnapshot, NewRegistration, PaymentUpdate, PaymentUpdateOutcome,
    Registration, RegistrationListing, RegistrationOutcome, RegistrationStats,
  },
  store::RegistrationLedger,
};

/// Creates registrations priced by a [`PricingPolicy`] and applies
/// admin-authorised payment transitions against a [`RegistrationLedger`].
pub struct RegistrationWorkflow<L> {
  ledger:  Arc<L>,
  pricing: PricingPolicy,
}

impl<L: RegistrationLedger> RegistrationWorkflow<L> {
  pub fn new(ledger: Arc<L>, pricing: PricingPolicy) -> Self {
    Self { ledger, pricing }
  }

  pub fn pricing(&self) -> &PricingPolicy { &self.pricing }

  /// Register `identity` at instant `now`.
  ///
  /// If the identity already has a pending or completed registration it is
  /// returned as [`RegistrationOutcome::Existing`]; nothing is written.
  pub async fn register(
    &self,
    identity: &Identity,
    now: DateTime<Utc>,
  ) -> Result<RegistrationOutcome> {
    let input = NewRegistration {
      owner_id:   identity.id,
      contact:    ContactSnapshot::of(identity),
      quote:      self.pricing.quote(now),
      created_at: now,
    };

    let outcome = self
      .ledger
      .create_registration(input)
      .await
      .map_err(Error::store)?;

    match &outcome {
      RegistrationOutcome::Created(r) => tracing::info!(
        registration = %r.id,
        owner = %r.owner_id,
        tier = r.tier.as_str(),
        amount = r.amount,
        "registration created"
      ),
      RegistrationOutcome::Existing(r) => tracing::debug!(
        registration = %r.id,
        owner = %r.owner_id,
        "active registration already exists"
      ),
    }
    Ok(outcome)
  }

  /// The identity's most recent registration, in any status.
  pub async fn latest_for(
    &self,
    identity: &Identity,
  ) -> Result<Option<Registration>> {
    self
      .ledger
      .latest_registration_for(identity.id)
      .await
      .map_err(Error::store)
  }

  /// Overwrite payment fields on a registration. Admin only.
  ///
  /// Any status may replace any other; no transition rules are enforced.
  /// Reactivating a failed registration fails with
  /// [`Error::ActiveRegistrationExists`] while the owner holds another active
  /// one.
  pub async fn update_payment_status(
    &self,
    actor: &Identity,
    registration_id: Uuid,
    update: PaymentUpdate,
  ) -> Result<Registration> {
    require_role(actor, Role::Admin)?;

    let outcome = self
      .ledger
      .update_payment(registration_id, update)
      .await
      .map_err(Error::store)?
      .ok_or(Error::RegistrationNotFound(registration_id))?;

    let registration = match outcome {
      PaymentUpdateOutcome::Updated(r) => r,
      PaymentUpdateOutcome::Blocked(active) => {
        tracing::debug!(
          registration = %registration_id,
          active = %active.id,
          "reactivation blocked by an active registration"
        );
        return Err(Error::ActiveRegistrationExists(Box::new(active)));
      }
    };

    tracing::info!(
      registration = %registration.id,
      actor = %actor.id,
      status = registration.payment_status.as_str(),
      verified = registration.payment_verified,
      "payment status updated"
    );
    Ok(registration)
  }

  /// All registrations with owner details. Admin only.
  pub async fn list(&self, actor: &Identity) -> Result<Vec<RegistrationListing>> {
    require_role(actor, Role::Admin)?;
    self.ledger.list_registrations().await.map_err(Error::store)
  }

  /// Totals per payment status. Admin only.
  pub async fn stats(&self, actor: &Identity) -> Result<RegistrationStats> {
    require_role(actor, Role::Admin)?;
    self.ledger.registration_stats().await.map_err(Error::store)
  }
}
