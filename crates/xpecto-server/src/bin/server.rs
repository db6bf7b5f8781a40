//! xpecto server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) layered under
//! `XPECTO_*` environment variables, opens an in-process SQLite store, and
//! serves the HTTP API.
//!
//! # Granting admin
//!
//! The API never hands out roles. To promote an existing account:
//!
//! ```
//! cargo run -p xpecto-server --bin server -- --promote-admin someone@example.com
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use xpecto_auth::GoogleVerifier;
use xpecto_core::{
  identity::{Role, normalize_email},
  store::ProfileStore,
};
use xpecto_server::{AppState, ServerConfig};
use xpecto_store_sqlite::SqliteStore;

#[derive(Parser)]
#[command(author, version, about = "Xpecto registration server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Grant the admin role to the account with this email and exit.
  #[arg(long, value_name = "EMAIL")]
  promote_admin: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("XPECTO"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  // Helper mode: promote an account and exit.
  if let Some(email) = cli.promote_admin {
    let email = normalize_email(&email);
    let identity = store
      .set_role(&email, Role::Admin)
      .await
      .context("failed to update role")?
      .with_context(|| format!("no account with email {email}"))?;
    tracing::info!(identity = %identity.id, %email, "promoted to admin");
    return Ok(());
  }

  let verifier =
    GoogleVerifier::new(server_cfg.google(), server_cfg.provider_timeout())
      .context("failed to build google verifier")?;

  let state = AppState::new(Arc::new(store), Arc::new(verifier), server_cfg.clone())
    .context("invalid configuration")?;

  let app = xpecto_server::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
