//! HTTP layer for Xpecto.
//!
//! Exposes an axum [`Router`] for sign-in, profile, registration and catalog
//! endpoints, backed by any store implementing the `xpecto-core` traits.

pub mod error;
pub mod gate;
pub mod handlers;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{
  Router,
  routing::{get, post, put},
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use xpecto_auth::{
  CookiePolicy, GoogleConfig, IdTokenVerifier, IdentityResolver, SessionIssuer,
};
use xpecto_core::{
  Error as CoreError,
  catalog::{Exhibition, Session},
  pricing::PricingPolicy,
  store::{ProfileStore, RegistrationLedger, Repository},
  workflow::RegistrationWorkflow,
};

use handlers::{auth, catalog, leads};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Deployment environment. Controls cookie hardening.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
  #[default]
  Development,
  Production,
}

/// Runtime server configuration, deserialised once at startup from
/// `config.toml` and `XPECTO_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                       String,
  #[serde(default = "default_port")]
  pub port:                       u16,
  #[serde(default = "default_store_path")]
  pub store_path:                 PathBuf,
  #[serde(default)]
  pub environment:                Environment,
  pub jwt_secret:                 String,
  #[serde(default)]
  pub cookie_domain:              Option<String>,
  #[serde(default = "default_frontend_url")]
  pub frontend_url:               String,
  #[serde(default)]
  pub google_client_id:           String,
  #[serde(default)]
  pub google_client_secret:       String,
  #[serde(default)]
  pub google_redirect_uri:        String,
  #[serde(default = "default_provider_timeout_secs")]
  pub provider_timeout_secs:      u64,
  #[serde(default = "default_pricing_utc_offset_minutes")]
  pub pricing_utc_offset_minutes: i32,
}

fn default_host() -> String { "127.0.0.1".into() }
fn default_port() -> u16 { 5000 }
fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/xpecto/xpecto.db") }
fn default_frontend_url() -> String { "http://localhost:5173".into() }
fn default_provider_timeout_secs() -> u64 { 10 }
fn default_pricing_utc_offset_minutes() -> i32 { 330 }

impl ServerConfig {
  pub fn google(&self) -> GoogleConfig {
    GoogleConfig {
      client_id:     self.google_client_id.clone(),
      client_secret: self.google_client_secret.clone(),
      redirect_uri:  self.google_redirect_uri.clone(),
    }
  }

  pub fn cookie_policy(&self) -> CookiePolicy {
    CookiePolicy::new(
      self.environment == Environment::Production,
      self.cookie_domain.clone(),
    )
  }

  pub fn provider_timeout(&self) -> Duration {
    Duration::from_secs(self.provider_timeout_secs)
  }

  /// Where the OAuth callback sends the browser afterwards.
  pub fn frontend_redirect(&self, outcome: &str) -> String {
    format!("{}/auth/{outcome}", self.frontend_url.trim_end_matches('/'))
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Everything the routes need from a storage backend.
pub trait Backend:
  ProfileStore
  + RegistrationLedger
  + Repository<Session>
  + Repository<Exhibition>
  + 'static
{
}

impl<T> Backend for T where
  T: ProfileStore
    + RegistrationLedger
    + Repository<Session>
    + Repository<Exhibition>
    + 'static
{
}

/// Shared state threaded through all axum handlers.
pub struct AppState<S, V> {
  pub store:    Arc<S>,
  pub config:   Arc<ServerConfig>,
  pub resolver: Arc<IdentityResolver<S, V>>,
  pub sessions: Arc<SessionIssuer>,
  pub workflow: Arc<RegistrationWorkflow<S>>,
}

impl<S, V> Clone for AppState<S, V> {
  fn clone(&self) -> Self {
    Self {
      store:    self.store.clone(),
      config:   self.config.clone(),
      resolver: self.resolver.clone(),
      sessions: self.sessions.clone(),
      workflow: self.workflow.clone(),
    }
  }
}

impl<S: Backend, V: IdTokenVerifier> AppState<S, V> {
  /// Assemble the auth and registration services from one config.
  pub fn new(
    store: Arc<S>,
    verifier: Arc<V>,
    config: ServerConfig,
  ) -> Result<Self, CoreError> {
    if config.jwt_secret.is_empty() {
      return Err(CoreError::Validation("jwt_secret must be set".into()));
    }
    let pricing =
      PricingPolicy::with_offset_minutes(config.pricing_utc_offset_minutes)?;

    let sessions =
      SessionIssuer::new(config.jwt_secret.as_bytes(), config.cookie_policy());
    let resolver =
      IdentityResolver::new(store.clone(), verifier, config.provider_timeout());
    let workflow = RegistrationWorkflow::new(store.clone(), pricing);

    Ok(Self {
      store,
      config: Arc::new(config),
      resolver: Arc::new(resolver),
      sessions: Arc::new(sessions),
      workflow: Arc::new(workflow),
    })
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router.
pub fn router<S, V>(state: AppState<S, V>) -> Router
where
  S: Backend,
  V: IdTokenVerifier + 'static,
{
  Router::new()
    .route("/", get(health))
    // Auth
    .route("/auth/google-onetap",    post(auth::google_one_tap::<S, V>))
    .route("/auth/google",           get(auth::google_start::<S, V>))
    .route("/auth/google/callback",  get(auth::google_callback::<S, V>))
    .route("/auth/register",         post(auth::register::<S, V>))
    .route("/auth/login",            post(auth::login::<S, V>))
    .route("/auth/me",               get(auth::me))
    .route("/auth/complete-profile", put(auth::complete_profile::<S, V>))
    .route("/auth/logout",           post(auth::logout::<S, V>))
    // Registrations
    .route("/leads",         post(leads::create::<S, V>).get(leads::list::<S, V>))
    .route("/leads/my-lead", get(leads::mine::<S, V>))
    .route("/leads/stats",   get(leads::stats::<S, V>))
    .route("/leads/{id}",    put(leads::update::<S, V>))
    // Catalog
    .route(
      "/sessions",
      get(catalog::list::<S, V, Session>).post(catalog::create::<S, V, Session>),
    )
    .route(
      "/sessions/{id}",
      get(catalog::get_one::<S, V, Session>)
        .put(catalog::update::<S, V, Session>)
        .delete(catalog::remove::<S, V, Session>),
    )
    .route(
      "/exhibitions",
      get(catalog::list::<S, V, Exhibition>)
        .post(catalog::create::<S, V, Exhibition>),
    )
    .route(
      "/exhibitions/{id}",
      get(catalog::get_one::<S, V, Exhibition>)
        .put(catalog::update::<S, V, Exhibition>)
        .delete(catalog::remove::<S, V, Exhibition>),
    )
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

async fn health() -> &'static str { "Backend is running" }
