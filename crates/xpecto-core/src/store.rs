//! Storage traits.
//!
//! Implemented by backends (e.g. `xpecto-store-sqlite`). The auth layer, the
//! workflow and the HTTP server depend on these abstractions, not on any
//! concrete backend.
//!
//! All methods return `Send` futures so the traits can be used from
//! multi-threaded runtimes (e.g. tokio with `axum`).

use std::future::Future;

use uuid::Uuid;

use crate::{
  catalog::{Entity, Record},
  identity::{Identity, NewIdentity, ProfileCompletion, Role},
  registration::{
    NewRegistration, PaymentUpdate, PaymentUpdateOutcome, Registration,
    RegistrationListing, RegistrationOutcome, RegistrationStats,
  },
};

// ─── Profiles ────────────────────────────────────────────────────────────────

/// Persistent identity records.
pub trait ProfileStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Retrieve an identity by id. Returns `None` if not found.
  fn get_identity(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + '_;

  /// Look up by normalised email.
  fn find_identity_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + 'a;

  /// Look up by Google subject id OR email. A subject-id match wins over an
  /// email match when both exist.
  fn find_identity_for_provider<'a>(
    &'a self,
    google_id: &'a str,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + 'a;

  /// Insert a new identity. Returns `None`, writing nothing, if the email or
  /// Google subject id is already taken.
  fn create_identity(
    &self,
    input: NewIdentity,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + '_;

  /// Link a Google account: set `google_id` only if none is stored yet, and
  /// replace the avatar when one is given. Other columns are untouched.
  /// Returns the stored record, or `None` if it no longer exists.
  fn link_provider<'a>(
    &'a self,
    id: Uuid,
    google_id: &'a str,
    avatar: Option<&'a str>,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + 'a;

  /// Write the three completion columns and nothing else. Returns the stored
  /// record, or `None` if it no longer exists.
  fn complete_profile<'a>(
    &'a self,
    id: Uuid,
    completion: &'a ProfileCompletion,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + 'a;

  /// Change an identity's role. Returns `None` if the email is unknown.
  fn set_role<'a>(
    &'a self,
    email: &'a str,
    role: Role,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + 'a;

  /// The argon2 hash for a local account, if it has one.
  fn password_hash(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + '_;
}

// ─── Registrations ───────────────────────────────────────────────────────────

/// Persistent registration and payment records.
pub trait RegistrationLedger: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Atomically insert `input` unless its owner already has a pending or
  /// completed registration, in which case that one is returned untouched.
  ///
  /// Concurrent calls for the same owner yield exactly one `Created`.
  fn create_registration(
    &self,
    input: NewRegistration,
  ) -> impl Future<Output = Result<RegistrationOutcome, Self::Error>> + Send + '_;

  fn get_registration(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Registration>, Self::Error>> + Send + '_;

  /// The owner's most recent registration in any status.
  fn latest_registration_for(
    &self,
    owner_id: Uuid,
  ) -> impl Future<Output = Result<Option<Registration>, Self::Error>> + Send + '_;

  /// All registrations, newest first, with owner fields joined in.
  fn list_registrations(
    &self,
  ) -> impl Future<Output = Result<Vec<RegistrationListing>, Self::Error>> + Send + '_;

  /// Apply `update` as one record-level write. Returns `None` if `id` is
  /// unknown, and [`PaymentUpdateOutcome::Blocked`], writing nothing, if the
  /// update would give the owner a second active registration.
  fn update_payment(
    &self,
    id: Uuid,
    update: PaymentUpdate,
  ) -> impl Future<Output = Result<Option<PaymentUpdateOutcome>, Self::Error>> + Send + '_;

  fn registration_stats(
    &self,
  ) -> impl Future<Output = Result<RegistrationStats, Self::Error>> + Send + '_;
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

/// Generic CRUD over one catalog entity type.
pub trait Repository<E: Entity>: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn create(
    &self,
    data: E,
  ) -> impl Future<Output = Result<Record<E>, Self::Error>> + Send + '_;

  /// All records, newest first.
  fn list(
    &self,
  ) -> impl Future<Output = Result<Vec<Record<E>>, Self::Error>> + Send + '_;

  fn get(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Record<E>>, Self::Error>> + Send + '_;

  /// Replace the document body. Returns `None` if `id` is unknown.
  fn update(
    &self,
    id: Uuid,
    data: E,
  ) -> impl Future<Output = Result<Option<Record<E>>, Self::Error>> + Send + '_;

  /// Returns `false` if `id` is unknown.
  fn delete(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
