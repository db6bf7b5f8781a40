//! [`IdentityResolver`]: from an external assertion or local credentials to
//! a stored [`Identity`].

use std::{future::Future, sync::Arc, time::Duration};

use xpecto_core::{
  identity::{Identity, NewIdentity, Role, normalize_email},
  store::ProfileStore,
};

use crate::{
  error::{AuthError, Result},
  google::{IdTokenVerifier, ProviderProfile},
  password::{MIN_PASSWORD_LEN, hash_password, verify_password},
};

pub struct IdentityResolver<P, V> {
  store:    Arc<P>,
  verifier: Arc<V>,
  timeout:  Duration,
}

impl<P: ProfileStore, V: IdTokenVerifier> IdentityResolver<P, V> {
  /// `timeout` bounds each call to the identity provider.
  pub fn new(store: Arc<P>, verifier: Arc<V>, timeout: Duration) -> Self {
    Self { store, verifier, timeout }
  }

  pub fn verifier(&self) -> &V { &self.verifier }

  async fn bounded<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(self.timeout, call)
      .await
      .map_err(|_| AuthError::Timeout)?
  }

  /// Verify a Google ID token and find, create or merge its identity.
  ///
  /// At most one write reaches the store. Nothing is written when
  /// verification fails or times out.
  pub async fn resolve(&self, id_token: &str) -> Result<Identity> {
    let claims = self.bounded(self.verifier.verify(id_token)).await?;
    let profile = ProviderProfile::from_claims(claims)?;
    self.merge(profile).await
  }

  /// Redirect-flow variant: exchange `code` for an ID token, then
  /// [`resolve`](Self::resolve) it.
  pub async fn resolve_code(&self, code: &str) -> Result<Identity> {
    let id_token = self.bounded(self.verifier.exchange_code(code)).await?;
    self.resolve(&id_token).await
  }

  async fn merge(&self, profile: ProviderProfile) -> Result<Identity> {
    let existing = self
      .store
      .find_identity_for_provider(&profile.google_id, &profile.email)
      .await
      .map_err(AuthError::store)?;

    let Some(identity) = existing else {
      return self.create(profile).await;
    };

    let needs_link = identity.google_id.is_none();
    let new_avatar = profile.avatar.is_some() && identity.avatar != profile.avatar;
    if !needs_link && !new_avatar {
      return Ok(identity);
    }

    // Writes google_id and avatar only.
    let saved = self
      .store
      .link_provider(identity.id, &profile.google_id, profile.avatar.as_deref())
      .await
      .map_err(AuthError::store)?
      .ok_or_else(|| AuthError::InvalidAssertion("identity no longer exists".into()))?;

    tracing::info!(identity = %saved.id, "linked google account to identity");
    Ok(saved)
  }

  async fn create(&self, profile: ProviderProfile) -> Result<Identity> {
    let google_id = profile.google_id.clone();
    let email = profile.email.clone();

    let created = self
      .store
      .create_identity(NewIdentity {
        google_id:     Some(profile.google_id),
        email:         profile.email,
        name:          profile.name,
        avatar:        profile.avatar,
        role:          Role::User,
        password_hash: None,
      })
      .await
      .map_err(AuthError::store)?;

    if let Some(identity) = created {
      tracing::info!(identity = %identity.id, "created identity from google sign-in");
      return Ok(identity);
    }

    // A concurrent sign-in for the same person won the insert.
    self
      .store
      .find_identity_for_provider(&google_id, &email)
      .await
      .map_err(AuthError::store)?
      .ok_or_else(|| AuthError::InvalidAssertion("identity could not be created".into()))
  }

  /// Create a local account. The password is stored only as an argon2 hash.
  pub async fn signup_local(
    &self,
    name: &str,
    email: &str,
    password: &str,
  ) -> Result<Identity> {
    let name = name.trim();
    let email = normalize_email(email);

    if name.is_empty() {
      return Err(AuthError::Validation("name is required".into()));
    }
    if email.is_empty() || !email.contains('@') {
      return Err(AuthError::Validation("a valid email is required".into()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
      return Err(AuthError::Validation(format!(
        "password must be at least {MIN_PASSWORD_LEN} characters"
      )));
    }

    let created = self
      .store
      .create_identity(NewIdentity {
        google_id:     None,
        email,
        name:          name.to_owned(),
        avatar:        None,
        role:          Role::User,
        password_hash: Some(hash_password(password)?),
      })
      .await
      .map_err(AuthError::store)?
      .ok_or(AuthError::EmailTaken)?;

    tracing::info!(identity = %created.id, "created local identity");
    Ok(created)
  }

  /// Check local credentials. Unknown emails, accounts without a password
  /// and wrong passwords are indistinguishable to the caller.
  pub async fn login_local(&self, email: &str, password: &str) -> Result<Identity> {
    let email = normalize_email(email);

    let identity = self
      .store
      .find_identity_by_email(&email)
      .await
      .map_err(AuthError::store)?
      .ok_or(AuthError::InvalidCredentials)?;

    let hash = self
      .store
      .password_hash(identity.id)
      .await
      .map_err(AuthError::store)?
      .ok_or(AuthError::InvalidCredentials)?;

    if !verify_password(password, &hash) {
      tracing::debug!(identity = %identity.id, "password mismatch");
      return Err(AuthError::InvalidCredentials);
    }
    Ok(identity)
  }
}
