//! [`SqliteStore`]: the SQLite implementation of [`ProfileStore`] and
//! [`RegistrationLedger`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;
use xpecto_core::{
  identity::{Identity, NewIdentity, ProfileCompletion, Role},
  registration::{
    NewRegistration, PaymentStatus, PaymentUpdate, PaymentUpdateOutcome,
    Registration, RegistrationListing, RegistrationOutcome, RegistrationStats,
    StatusBucket,
  },
  store::{ProfileStore, RegistrationLedger},
};

use crate::{
  Result,
  encode::{
    IDENTITY_COLUMNS, REGISTRATION_COLUMNS, RawIdentity, RawListing,
    RawRegistration, decode_status, encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// Profiles, registrations and catalog documents in a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn identity_where(
    &self,
    clause: &'static str,
    value: String,
  ) -> Result<Option<Identity>> {
    let raw: Option<RawIdentity> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {IDENTITY_COLUMNS} FROM identities WHERE {clause}"),
              rusqlite::params![value],
              RawIdentity::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawIdentity::into_identity).transpose()
  }
}

pub(crate) fn is_constraint_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(err, _)
      if err.code == rusqlite::ErrorCode::ConstraintViolation
  )
}

/// The owner's pending or completed registration, if any.
fn active_registration(
  conn: &rusqlite::Connection,
  owner_id: &str,
) -> rusqlite::Result<Option<RawRegistration>> {
  conn
    .query_row(
      &format!(
        "SELECT {REGISTRATION_COLUMNS} FROM registrations r
         WHERE r.owner_id = ?1
           AND r.payment_status IN ('pending', 'completed')
         ORDER BY r.created_at DESC
         LIMIT 1"
      ),
      rusqlite::params![owner_id],
      RawRegistration::from_row,
    )
    .optional()
}

enum Insert {
  Created,
  Existing(RawRegistration),
}

enum Update {
  Updated(RawRegistration),
  Blocked(RawRegistration),
}

// ─── ProfileStore impl ───────────────────────────────────────────────────────

impl ProfileStore for SqliteStore {
  type Error = crate::Error;

  async fn get_identity(&self, id: Uuid) -> Result<Option<Identity>> {
    self.identity_where("identity_id = ?1", encode_uuid(id)).await
  }

  async fn find_identity_by_email(&self, email: &str) -> Result<Option<Identity>> {
    self.identity_where("email = ?1", email.to_owned()).await
  }

  async fn find_identity_for_provider(
    &self,
    google_id: &str,
    email: &str,
  ) -> Result<Option<Identity>> {
    let google_id = google_id.to_owned();
    let email = email.to_owned();

    let raw: Option<RawIdentity> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {IDENTITY_COLUMNS} FROM identities
                 WHERE google_id = ?1 OR email = ?2
                 ORDER BY CASE WHEN google_id = ?1 THEN 0 ELSE 1 END
                 LIMIT 1"
              ),
              rusqlite::params![google_id, email],
              RawIdentity::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawIdentity::into_identity).transpose()
  }

  async fn create_identity(&self, input: NewIdentity) -> Result<Option<Identity>> {
    let now = Utc::now();
    let identity = Identity {
      id:                Uuid::new_v4(),
      google_id:         input.google_id,
      email:             input.email,
      name:              input.name,
      avatar:            input.avatar,
      role:              input.role,
      secondary_email:   None,
      organization_name: None,
      phone:             None,
      created_at:        now,
      updated_at:        now,
    };

    let id_str        = encode_uuid(identity.id);
    let google_id     = identity.google_id.clone();
    let email         = identity.email.clone();
    let name          = identity.name.clone();
    let avatar        = identity.avatar.clone();
    let role_str      = identity.role.as_str();
    let at_str        = encode_dt(now);
    let password_hash = input.password_hash;

    let inserted = self
      .conn
      .call(move |conn| {
        let result = conn.execute(
          "INSERT INTO identities (
             identity_id, google_id, email, name, avatar, role,
             password_hash, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
          rusqlite::params![
            id_str,
            google_id,
            email,
            name,
            avatar,
            role_str,
            password_hash,
            at_str,
          ],
        );
        match result {
          Ok(_) => Ok(true),
          Err(e) if is_constraint_violation(&e) => Ok(false),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    Ok(inserted.then_some(identity))
  }

  async fn link_provider(
    &self,
    id: Uuid,
    google_id: &str,
    avatar: Option<&str>,
  ) -> Result<Option<Identity>> {
    let id_str    = encode_uuid(id);
    let google_id = google_id.to_owned();
    let avatar    = avatar.map(str::to_owned);
    let at_str    = encode_dt(Utc::now());

    // An already-linked google_id is never replaced.
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE identities
              SET google_id  = COALESCE(google_id, ?2),
                  avatar     = COALESCE(?3, avatar),
                  updated_at = ?4
            WHERE identity_id = ?1",
          rusqlite::params![id_str, google_id, avatar, at_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.get_identity(id).await
  }

  async fn complete_profile(
    &self,
    id: Uuid,
    completion: &ProfileCompletion,
  ) -> Result<Option<Identity>> {
    let id_str    = encode_uuid(id);
    let secondary = completion.secondary_email.clone();
    let org       = completion.organization_name.clone();
    let phone     = completion.phone.clone();
    let at_str    = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE identities
              SET secondary_email = ?2, organization_name = ?3, phone = ?4,
                  updated_at = ?5
            WHERE identity_id = ?1",
          rusqlite::params![id_str, secondary, org, phone, at_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.get_identity(id).await
  }

  async fn set_role(&self, email: &str, role: Role) -> Result<Option<Identity>> {
    let email_owned = email.to_owned();
    let role_str    = role.as_str();
    let at_str      = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE identities SET role = ?2, updated_at = ?3 WHERE email = ?1",
          rusqlite::params![email_owned, role_str, at_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.find_identity_by_email(email).await
  }

  async fn password_hash(&self, id: Uuid) -> Result<Option<String>> {
    let id_str = encode_uuid(id);

    let hash: Option<Option<String>> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT password_hash FROM identities WHERE identity_id = ?1",
              rusqlite::params![id_str],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    Ok(hash.flatten())
  }
}

// ─── RegistrationLedger impl ─────────────────────────────────────────────────

impl RegistrationLedger for SqliteStore {
  type Error = crate::Error;

  async fn create_registration(
    &self,
    input: NewRegistration,
  ) -> Result<RegistrationOutcome> {
    let registration = Registration {
      id:               Uuid::new_v4(),
      owner_id:         input.owner_id,
      contact:          input.contact,
      tier:             input.quote.tier,
      amount:           input.quote.amount,
      payment_status:   PaymentStatus::Pending,
      payment_verified: false,
      transaction_id:   None,
      notes:            None,
      created_at:       input.created_at,
      updated_at:       input.created_at,
    };

    let id_str       = encode_uuid(registration.id);
    let owner_str    = encode_uuid(registration.owner_id);
    let name         = registration.contact.name.clone();
    let email        = registration.contact.email.clone();
    let phone        = registration.contact.phone.clone();
    let organization = registration.contact.organization.clone();
    let tier_str     = registration.tier.as_str();
    let amount       = registration.amount;
    let at_str       = encode_dt(registration.created_at);

    // Check and insert under one IMMEDIATE transaction; the partial unique
    // index catches writers on other connections.
    let insert = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if let Some(raw) = active_registration(&tx, &owner_str)? {
          return Ok(Insert::Existing(raw));
        }

        let result = tx.execute(
          "INSERT INTO registrations (
             registration_id, owner_id, name, email, phone, organization,
             tier, amount, payment_status, payment_verified,
             created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'pending', 0, ?9, ?9)",
          rusqlite::params![
            id_str,
            owner_str,
            name,
            email,
            phone,
            organization,
            tier_str,
            amount,
            at_str,
          ],
        );

        match result {
          Ok(_) => {
            tx.commit()?;
            Ok(Insert::Created)
          }
          Err(e) if is_constraint_violation(&e) => {
            match active_registration(&tx, &owner_str)? {
              Some(raw) => Ok(Insert::Existing(raw)),
              None => Err(e.into()),
            }
          }
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    match insert {
      Insert::Created => Ok(RegistrationOutcome::Created(registration)),
      Insert::Existing(raw) => {
        Ok(RegistrationOutcome::Existing(raw.into_registration()?))
      }
    }
  }

  async fn get_registration(&self, id: Uuid) -> Result<Option<Registration>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawRegistration> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {REGISTRATION_COLUMNS} FROM registrations r
                 WHERE r.registration_id = ?1"
              ),
              rusqlite::params![id_str],
              RawRegistration::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRegistration::into_registration).transpose()
  }

  async fn latest_registration_for(
    &self,
    owner_id: Uuid,
  ) -> Result<Option<Registration>> {
    let owner_str = encode_uuid(owner_id);

    let raw: Option<RawRegistration> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {REGISTRATION_COLUMNS} FROM registrations r
                 WHERE r.owner_id = ?1
                 ORDER BY r.created_at DESC, r.rowid DESC
                 LIMIT 1"
              ),
              rusqlite::params![owner_str],
              RawRegistration::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRegistration::into_registration).transpose()
  }

  async fn list_registrations(&self) -> Result<Vec<RegistrationListing>> {
    let raws: Vec<RawListing> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {REGISTRATION_COLUMNS}, i.name, i.email, i.avatar
           FROM registrations r
           LEFT JOIN identities i ON i.identity_id = r.owner_id
           ORDER BY r.created_at DESC, r.rowid DESC"
        ))?;
        let rows = stmt
          .query_map([], RawListing::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawListing::into_listing).collect()
  }

  async fn update_payment(
    &self,
    id: Uuid,
    update: PaymentUpdate,
  ) -> Result<Option<PaymentUpdateOutcome>> {
    let id_str     = encode_uuid(id);
    let status_str = update.payment_status.map(PaymentStatus::as_str);
    let verified   = update.payment_verified;
    let tx_ref     = update.transaction_id;
    let notes      = update.notes;
    let at_str     = encode_dt(Utc::now());

    let select = format!(
      "SELECT {REGISTRATION_COLUMNS} FROM registrations r
       WHERE r.registration_id = ?1"
    );

    let outcome: Option<Update> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let result = tx.execute(
          "UPDATE registrations
              SET payment_status   = COALESCE(?2, payment_status),
                  payment_verified = COALESCE(?3, payment_verified),
                  transaction_id   = COALESCE(?4, transaction_id),
                  notes            = COALESCE(?5, notes),
                  updated_at       = ?6
            WHERE registration_id = ?1",
          rusqlite::params![id_str, status_str, verified, tx_ref, notes, at_str],
        );

        match result {
          Ok(0) => Ok(None),
          Ok(_) => {
            let raw = tx
              .query_row(
                &select,
                rusqlite::params![id_str],
                RawRegistration::from_row,
              )
              .optional()?;
            tx.commit()?;
            Ok(raw.map(Update::Updated))
          }
          // The one-active index refused a reactivation; report the
          // registration that holds the slot. Dropping `tx` rolls back.
          Err(e) if is_constraint_violation(&e) => {
            let owner: Option<String> = tx
              .query_row(
                "SELECT owner_id FROM registrations WHERE registration_id = ?1",
                rusqlite::params![id_str],
                |row| row.get(0),
              )
              .optional()?;
            let active = match owner {
              Some(owner) => active_registration(&tx, &owner)?,
              None => None,
            };
            match active {
              Some(raw) => Ok(Some(Update::Blocked(raw))),
              None => Err(e.into()),
            }
          }
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    outcome
      .map(|update| match update {
        Update::Updated(raw) => {
          raw.into_registration().map(PaymentUpdateOutcome::Updated)
        }
        Update::Blocked(raw) => {
          raw.into_registration().map(PaymentUpdateOutcome::Blocked)
        }
      })
      .transpose()
  }

  async fn registration_stats(&self) -> Result<RegistrationStats> {
    let (total, verified, groups): (i64, i64, Vec<(String, i64, i64)>) = self
      .conn
      .call(|conn| {
        let (total, verified) = conn.query_row(
          "SELECT COUNT(*), COALESCE(SUM(payment_verified), 0) FROM registrations",
          [],
          |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let mut stmt = conn.prepare(
          "SELECT payment_status, COUNT(*), COALESCE(SUM(amount), 0)
           FROM registrations
           GROUP BY payment_status
           ORDER BY CASE payment_status
                      WHEN 'pending'   THEN 0
                      WHEN 'completed' THEN 1
                      ELSE 2
                    END",
        )?;
        let groups = stmt
          .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((total, verified, groups))
      })
      .await?;

    let per_status = groups
      .into_iter()
      .map(|(status, count, total_amount)| {
        Ok(StatusBucket {
          status: decode_status(&status)?,
          count: count as u64,
          total_amount,
        })
      })
      .collect::<Result<Vec<_>>>()?;

    Ok(RegistrationStats {
      total_count: total as u64,
      verified_count: verified as u64,
      per_status,
    })
  }
}
