//! Agora server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, and serves the JSON API under `/api`.
//!
//! # Bootstrapping an admin
//!
//! Admin rights are granted out of band. After the account has signed in
//! once (so its profile exists):
//!
//! ```text
//! cargo run -p agora-server -- --grant-admin <profile-uuid>
//! ```

mod config;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use agora_core::{clock::SystemClock, profile::Role, store::SocialStore};
use agora_engine::Engine;
use agora_store_sqlite::SqliteStore;
use anyhow::Context as _;
use axum::Router;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::config::ServerConfig;

#[derive(Parser)]
#[command(author, version, about = "Agora social API server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Give the profile with this id the admin role and exit.
  #[arg(long, value_name = "PROFILE_ID")]
  grant_admin: Option<Uuid>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = ::config::Config::builder()
    .add_source(::config::File::from(cli.config).required(false))
    .add_source(::config::Environment::with_prefix("AGORA").separator("__"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;
  server_cfg.engine.validate().context("invalid engine configuration")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(parent) = store_path.parent().filter(|p| !p.as_os_str().is_empty()) {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  // Helper mode: promote an existing profile and exit.
  if let Some(id) = cli.grant_admin {
    let updated = store.set_role(id, Role::Admin).await.context("failed to update role")?;
    anyhow::ensure!(updated, "no profile with id {id}");
    tracing::info!(%id, "granted admin role");
    return Ok(());
  }

  let engine = Arc::new(Engine::new(Arc::new(store), SystemClock, server_cfg.engine.clone()));
  let app = Router::new().nest("/api", agora_api::api_router(engine));
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
  match (s.strip_prefix("~/"), std::env::var("HOME")) {
    (Some(rest), Ok(home)) => PathBuf::from(home).join(rest),
    _ => path.to_path_buf(),
  }
}
