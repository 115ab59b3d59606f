//! `mapbook-server` binary.
//!
//! Settings come from an optional TOML file (`--config`, default
//! `config.toml`) overridden by `MAPBOOK_*` environment variables, e.g.
//! `MAPBOOK_PORT=9000`. See `config.example.toml` at the workspace root.
//!
//! Run with `--hash-password` to turn a password read from stdin into the
//! argon2 PHC string expected in a `[[users]]` entry.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use clap::Parser;
use mapbook_server::{AppState, ServerConfig};
use mapbook_store_sqlite::SqliteStore;
use rand_core::OsRng;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Mapbook live report server")]
struct Cli {
  /// TOML settings file; missing is fine.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Hash a password from stdin, print the PHC string, and exit.
  #[arg(long)]
  hash_password: bool,
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
  if cli.hash_password {
    println!("{}", hash_stdin_password()?);
    return Ok(());
  }

  let server_cfg = load_config(cli.config)?;
  if server_cfg.users.is_empty() {
    tracing::warn!("no [[users]] configured; every request will get 401");
  }

  let store = open_store(&server_cfg.store_path).await?;

  let bind_to = format!("{}:{}", server_cfg.host, server_cfg.port);
  let idle    = server_cfg.stream_idle_secs;
  let app     = mapbook_server::router(AppState::new(store, server_cfg));

  let listener = TcpListener::bind(&bind_to)
    .await
    .with_context(|| format!("could not bind {bind_to}"))?;
  tracing::info!(address = %bind_to, stream_idle_secs = idle, "mapbook listening");

  axum::serve(listener, app).await.context("server exited with an error")
}

fn load_config(file: PathBuf) -> anyhow::Result<ServerConfig> {
  config::Config::builder()
    .add_source(config::File::from(file).required(false))
    .add_source(config::Environment::with_prefix("MAPBOOK"))
    .build()
    .context("could not load settings")?
    .try_deserialize()
    .context("invalid settings")
}

/// Open the database, creating its parent directory on first run.
async fn open_store(configured: &Path) -> anyhow::Result<SqliteStore> {
  let path = expand_home(configured);
  if let Some(dir) = path.parent()
    && !dir.as_os_str().is_empty()
  {
    std::fs::create_dir_all(dir).with_context(|| format!("could not create {}", dir.display()))?;
  }

  SqliteStore::open(&path)
    .await
    .with_context(|| format!("could not open report store {}", path.display()))
}

fn hash_stdin_password() -> anyhow::Result<String> {
  use std::io::{BufRead as _, Write as _};

  eprint!("Password: ");
  std::io::stderr().flush().ok();
  let mut line = String::new();
  std::io::stdin().lock().read_line(&mut line)?;
  let password = line.trim_end_matches(['\n', '\r']);

  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| anyhow::anyhow!("could not hash password: {e}"))
}

/// `~/x` becomes `$HOME/x`; anything else is returned unchanged.
fn expand_home(path: &Path) -> PathBuf {
  match (path.strip_prefix("~"), std::env::var_os("HOME")) {
    (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
    _ => path.to_path_buf(),
  }
}
