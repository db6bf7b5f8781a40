//! Session credentials: an HS256 JWT carried in an `HttpOnly` cookie.
//!
//! Tokens are valid for seven days from issue and are never refreshed.
//! Expiry is checked against the caller-supplied instant rather than the
//! system clock so it can be exercised deterministically.

use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{
  Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use xpecto_core::identity::{Identity, Role};

use crate::error::SessionError;

pub const ISSUER: &str = "xpecto-api";
pub const COOKIE_NAME: &str = "token";

/// Seven days.
pub const SESSION_TTL: TimeDelta = TimeDelta::days(7);

// ─── Claims ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
  pub id:    Uuid,
  pub email: String,
  pub name:  String,
  pub role:  Role,
  /// Seconds since the Unix epoch.
  pub iat:   i64,
  pub exp:   i64,
  pub iss:   String,
}

// ─── Cookie policy ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
  Strict,
  Lax,
}

impl SameSite {
  fn as_str(self) -> &'static str {
    match self {
      SameSite::Strict => "Strict",
      SameSite::Lax => "Lax",
    }
  }
}

/// Attributes of the session cookie for one deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookiePolicy {
  pub secure:    bool,
  pub same_site: SameSite,
  /// Only emitted when set.
  pub domain:    Option<String>,
}

impl CookiePolicy {
  /// Production cookies are `Secure`, `SameSite=Strict` and scoped to the
  /// configured domain. Development cookies are `SameSite=Lax` and
  /// host-only.
  pub fn new(production: bool, domain: Option<String>) -> Self {
    if production {
      Self {
        secure:    true,
        same_site: SameSite::Strict,
        domain:    domain.filter(|d| !d.is_empty()),
      }
    } else {
      Self { secure: false, same_site: SameSite::Lax, domain: None }
    }
  }

  fn render(&self, value: &str, max_age: i64) -> String {
    let mut cookie = format!(
      "{COOKIE_NAME}={value}; Path=/; Max-Age={max_age}; HttpOnly; SameSite={}",
      self.same_site.as_str()
    );
    if self.secure {
      cookie.push_str("; Secure");
    }
    if let Some(domain) = &self.domain {
      cookie.push_str("; Domain=");
      cookie.push_str(domain);
    }
    cookie
  }

  /// `Set-Cookie` value carrying `token`.
  pub fn set_cookie(&self, token: &str) -> String {
    self.render(token, SESSION_TTL.num_seconds())
  }

  /// `Set-Cookie` value that removes the session cookie.
  pub fn clear_cookie(&self) -> String { self.render("", 0) }
}

/// Find cookie `name` in a `Cookie` request header value.
pub fn find_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
  header
    .split(';')
    .filter_map(|pair| pair.trim().split_once('='))
    .find(|(key, _)| *key == name)
    .map(|(_, value)| value)
}

// ─── Issuer ──────────────────────────────────────────────────────────────────

/// Signs and checks session tokens with a shared secret.
pub struct SessionIssuer {
  encoding: EncodingKey,
  decoding: DecodingKey,
  cookie:   CookiePolicy,
}

impl SessionIssuer {
  pub fn new(secret: &[u8], cookie: CookiePolicy) -> Self {
    Self {
      encoding: EncodingKey::from_secret(secret),
      decoding: DecodingKey::from_secret(secret),
      cookie,
    }
  }

  pub fn cookie(&self) -> &CookiePolicy { &self.cookie }

  /// Mint a token for `identity` valid from `now` for [`SESSION_TTL`].
  pub fn issue(
    &self,
    identity: &Identity,
    now: DateTime<Utc>,
  ) -> Result<String, SessionError> {
    let claims = SessionClaims {
      id:    identity.id,
      email: identity.email.clone(),
      name:  identity.name.clone(),
      role:  identity.role,
      iat:   now.timestamp(),
      exp:   (now + SESSION_TTL).timestamp(),
      iss:   ISSUER.to_owned(),
    };
    encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
      .map_err(SessionError::Signing)
  }

  /// Check a presented token at instant `now`.
  pub fn parse(
    &self,
    token: Option<&str>,
    now: DateTime<Utc>,
  ) -> Result<SessionClaims, SessionError> {
    let token = token
      .filter(|t| !t.is_empty())
      .ok_or(SessionError::Missing)?;

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.set_issuer(&[ISSUER]);

    let claims = decode::<SessionClaims>(token, &self.decoding, &validation)
      .map_err(SessionError::Invalid)?
      .claims;

    if now.timestamp() >= claims.exp {
      return Err(SessionError::Expired);
    }
    Ok(claims)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn identity() -> Identity {
    let now = Utc::now();
    Identity {
      id:                Uuid::new_v4(),
      google_id:         None,
      email:             "a@x.com".into(),
      name:              "A".into(),
      avatar:            None,
      role:              Role::User,
      secondary_email:   None,
      organization_name: None,
      phone:             None,
      created_at:        now,
      updated_at:        now,
    }
  }

  fn issuer() -> SessionIssuer {
    SessionIssuer::new(b"test-secret", CookiePolicy::new(false, None))
  }

  #[test]
  fn issued_token_parses_within_window() {
    let issuer = issuer();
    let who = identity();
    let t = Utc::now();

    let token = issuer.issue(&who, t).unwrap();
    let claims = issuer
      .parse(Some(&token), t + TimeDelta::days(6))
      .unwrap();
    assert_eq!(claims.id, who.id);
    assert_eq!(claims.role, Role::User);
    assert_eq!(claims.iss, ISSUER);
    assert_eq!(claims.exp - claims.iat, SESSION_TTL.num_seconds());
  }

  #[test]
  fn token_expires_after_seven_days() {
    let issuer = issuer();
    let t = Utc::now();
    let token = issuer.issue(&identity(), t).unwrap();

    assert!(matches!(
      issuer.parse(Some(&token), t + TimeDelta::days(8)),
      Err(SessionError::Expired)
    ));
  }

  #[test]
  fn missing_and_foreign_tokens_are_rejected() {
    let issuer = issuer();
    assert!(matches!(issuer.parse(None, Utc::now()), Err(SessionError::Missing)));
    assert!(matches!(
      issuer.parse(Some(""), Utc::now()),
      Err(SessionError::Missing)
    ));

    let other = SessionIssuer::new(b"other-secret", CookiePolicy::new(false, None));
    let token = other.issue(&identity(), Utc::now()).unwrap();
    assert!(matches!(
      issuer.parse(Some(&token), Utc::now()),
      Err(SessionError::Invalid(_))
    ));
  }

  #[test]
  fn tampered_token_is_rejected() {
    let issuer = issuer();
    let token = issuer.issue(&identity(), Utc::now()).unwrap();
    let (signed, signature) = token.rsplit_once('.').unwrap();
    let flipped = if signature.starts_with('A') { 'B' } else { 'A' };
    let tampered = format!("{signed}.{flipped}{}", &signature[1..]);
    assert!(matches!(
      issuer.parse(Some(&tampered), Utc::now()),
      Err(SessionError::Invalid(_))
    ));
  }

  #[test]
  fn cookie_attributes_follow_environment() {
    let dev = CookiePolicy::new(false, Some("xpecto.org".into()));
    let cookie = dev.set_cookie("abc");
    assert!(cookie.starts_with("token=abc; Path=/; Max-Age=604800; HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(!cookie.contains("Secure"));
    assert!(!cookie.contains("Domain"));

    let prod = CookiePolicy::new(true, Some("xpecto.org".into()));
    let cookie = prod.set_cookie("abc");
    assert!(cookie.contains("SameSite=Strict"));
    assert!(cookie.contains("; Secure"));
    assert!(cookie.ends_with("; Domain=xpecto.org"));

    assert!(prod.clear_cookie().starts_with("token=; Path=/; Max-Age=0"));
  }

  #[test]
  fn finds_cookie_among_others() {
    let header = "theme=dark; token=abc.def.ghi; lang=en";
    assert_eq!(find_cookie(header, "token"), Some("abc.def.ghi"));
    assert_eq!(find_cookie(header, "missing"), None);
  }
}
