//! Google Sign-In: ID-token verification against Google's published keys and
//! the authorization-code leg of the redirect flow.

use std::{
  future::Future,
  time::{Duration, Instant},
};

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use xpecto_core::identity::{email_local_part, normalize_email};

use crate::error::{AuthError, Result};

pub const AUTHORIZATION_ENDPOINT: &str =
  "https://accounts.google.com/o/oauth2/v2/auth";
pub const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
pub const JWKS_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v3/certs";

/// Issuer values Google puts in ID tokens. Both spellings occur.
pub const GOOGLE_ISSUERS: [&str; 2] =
  ["accounts.google.com", "https://accounts.google.com"];

const JWKS_TTL: Duration = Duration::from_secs(3600);

// ─── Claims ──────────────────────────────────────────────────────────────────

/// The subset of a Google ID token's payload we read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdTokenClaims {
  pub iss:     String,
  pub sub:     String,
  pub aud:     String,
  pub exp:     i64,
  pub email:   Option<String>,
  pub name:    Option<String>,
  pub picture: Option<String>,
}

/// Profile fields extracted from verified claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
  pub google_id: String,
  /// Lower-cased.
  pub email:     String,
  pub name:      String,
  pub avatar:    Option<String>,
}

impl ProviderProfile {
  /// Check the issuer allow-list and pull out the profile. Fails when the
  /// email is absent.
  pub fn from_claims(claims: IdTokenClaims) -> Result<Self> {
    if !GOOGLE_ISSUERS.contains(&claims.iss.as_str()) {
      return Err(AuthError::InvalidAssertion(format!(
        "unexpected issuer {:?}",
        claims.iss
      )));
    }

    let email = claims
      .email
      .as_deref()
      .map(normalize_email)
      .filter(|e| !e.is_empty())
      .ok_or_else(|| AuthError::InvalidAssertion("token carries no email".into()))?;

    let name = claims
      .name
      .map(|n| n.trim().to_owned())
      .filter(|n| !n.is_empty())
      .unwrap_or_else(|| email_local_part(&email).to_owned());

    Ok(Self {
      google_id: claims.sub,
      email,
      name,
      avatar: claims.picture.filter(|p| !p.is_empty()),
    })
  }
}

// ─── Verifier trait ──────────────────────────────────────────────────────────

/// Verifies external identity assertions.
///
/// [`GoogleVerifier`] is the production implementation; tests substitute a
/// stub.
pub trait IdTokenVerifier: Send + Sync {
  /// Check signature, audience, issuer and expiry of `id_token`.
  fn verify<'a>(
    &'a self,
    id_token: &'a str,
  ) -> impl Future<Output = Result<IdTokenClaims>> + Send + 'a;

  /// Trade an authorization code for an ID token.
  fn exchange_code<'a>(
    &'a self,
    code: &'a str,
  ) -> impl Future<Output = Result<String>> + Send + 'a;

  /// Where to send a browser to start the redirect flow.
  fn authorization_url(&self) -> String;
}

// ─── Google ──────────────────────────────────────────────────────────────────

/// OAuth client registration.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
  pub client_id:     String,
  pub client_secret: String,
  pub redirect_uri:  String,
}

#[derive(Debug, Clone, Deserialize)]
struct JwkSet {
  keys: Vec<Jwk>,
}

#[derive(Debug, Clone, Deserialize)]
struct Jwk {
  kid: Option<String>,
  n:   String,
  e:   String,
}

impl JwkSet {
  fn find(&self, kid: &str) -> Option<&Jwk> {
    self.keys.iter().find(|k| k.kid.as_deref() == Some(kid))
  }
}

struct CachedKeys {
  keys:       JwkSet,
  fetched_at: Instant,
}

#[derive(Deserialize)]
struct TokenResponse {
  id_token: Option<String>,
}

pub struct GoogleVerifier {
  config: GoogleConfig,
  http:   reqwest::Client,
  keys:   RwLock<Option<CachedKeys>>,
}

impl GoogleVerifier {
  /// Every outbound request is bounded by `timeout`.
  pub fn new(config: GoogleConfig, timeout: Duration) -> Result<Self> {
    let http = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| AuthError::Provider(format!("http client: {e}")))?;
    Ok(Self { config, http, keys: RwLock::new(None) })
  }

  async fn fetch_keys(&self) -> Result<JwkSet> {
    let keys = self
      .http
      .get(JWKS_ENDPOINT)
      .send()
      .await
      .and_then(reqwest::Response::error_for_status)
      .map_err(|e| AuthError::Provider(format!("fetching signing keys: {e}")))?
      .json::<JwkSet>()
      .await
      .map_err(|e| AuthError::Provider(format!("parsing signing keys: {e}")))?;
    tracing::debug!(count = keys.keys.len(), "fetched google signing keys");
    Ok(keys)
  }

  /// The RSA components for `kid`, refreshing the cache once if the key is
  /// unknown or the cache is stale.
  async fn key_for(&self, kid: &str) -> Result<(String, String)> {
    {
      let cache = self.keys.read().await;
      let fresh = cache
        .as_ref()
        .filter(|cached| cached.fetched_at.elapsed() < JWKS_TTL);
      if let Some(key) = fresh.and_then(|cached| cached.keys.find(kid)) {
        return Ok((key.n.clone(), key.e.clone()));
      }
    }

    let keys = self.fetch_keys().await?;
    let found = keys.find(kid).map(|k| (k.n.clone(), k.e.clone()));
    *self.keys.write().await = Some(CachedKeys { keys, fetched_at: Instant::now() });

    found.ok_or_else(|| {
      AuthError::InvalidAssertion(format!("unknown signing key {kid:?}"))
    })
  }
}

impl IdTokenVerifier for GoogleVerifier {
  async fn verify(&self, id_token: &str) -> Result<IdTokenClaims> {
    let header = decode_header(id_token)
      .map_err(|e| AuthError::InvalidAssertion(format!("malformed token: {e}")))?;

    if header.alg != Algorithm::RS256 {
      return Err(AuthError::InvalidAssertion(format!(
        "unexpected algorithm {:?}",
        header.alg
      )));
    }
    let kid = header
      .kid
      .ok_or_else(|| AuthError::InvalidAssertion("token has no key id".into()))?;

    let (n, e) = self.key_for(&kid).await?;
    let key = DecodingKey::from_rsa_components(&n, &e)
      .map_err(|e| AuthError::Provider(format!("bad signing key: {e}")))?;

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_issuer(&GOOGLE_ISSUERS);
    validation.set_audience(&[&self.config.client_id]);

    let data = decode::<IdTokenClaims>(id_token, &key, &validation)
      .map_err(|e| AuthError::InvalidAssertion(e.to_string()))?;
    Ok(data.claims)
  }

  async fn exchange_code(&self, code: &str) -> Result<String> {
    let params = [
      ("code", code),
      ("client_id", self.config.client_id.as_str()),
      ("client_secret", self.config.client_secret.as_str()),
      ("redirect_uri", self.config.redirect_uri.as_str()),
      ("grant_type", "authorization_code"),
    ];

    let response = self
      .http
      .post(TOKEN_ENDPOINT)
      .form(&params)
      .send()
      .await
      .map_err(|e| AuthError::Provider(format!("token exchange: {e}")))?;

    if !response.status().is_success() {
      let status = response.status();
      return Err(AuthError::Provider(format!("token exchange returned {status}")));
    }

    response
      .json::<TokenResponse>()
      .await
      .map_err(|e| AuthError::Provider(format!("token response: {e}")))?
      .id_token
      .ok_or_else(|| AuthError::Provider("token response has no id_token".into()))
  }

  fn authorization_url(&self) -> String {
    authorization_url(&self.config)
  }
}

/// The consent-screen URL for the redirect flow.
pub fn authorization_url(config: &GoogleConfig) -> String {
  let query = serde_urlencoded::to_string([
    ("client_id", config.client_id.as_str()),
    ("redirect_uri", config.redirect_uri.as_str()),
    ("response_type", "code"),
    ("scope", "openid email profile"),
    ("access_type", "online"),
    ("prompt", "select_account"),
  ])
  .unwrap_or_default();
  format!("{AUTHORIZATION_ENDPOINT}?{query}")
}
