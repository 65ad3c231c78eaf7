//! Invoicer backend: trial lifecycle, pricing, checkout and contact intake.
//!
//! Architecture:
//! - SeaORM for database access (SQLite)
//! - Axum for HTTP API with rate limiting
//! - Pluggable identity, payment and notification collaborators
//! - Tokio for async runtime

// `FromJsonQueryResult` expands to `serde_json::` paths.
extern crate json as serde_json;

mod clock;
mod config;
mod entity;
mod error;
mod identity;
mod notify;
mod payment;
mod plugins;
mod prelude;
mod state;
mod sv;
#[cfg(test)]
mod testing;
mod utils;

use tracing_subscriber::{
  EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::{config::Config, prelude::*, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  dotenvy::dotenv().ok();

  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
      "invoicer=debug,tower_http=debug,sea_orm=warn".into()
    }))
    .with(tracing_subscriber::fmt::layer())
    .init();

  let config = Config::from_env()?;

  info!("Starting Invoicer v{}", env!("CARGO_PKG_VERSION"));

  let app = Arc::new(AppState::connect(config).await?);

  let _services =
    plugins::App::new().register(plugins::server::Plugin).run(app);

  tokio::signal::ctrl_c().await.context("Failed to listen for ctrl-c")?;
  info!("Shutting down");

  Ok(())
}
