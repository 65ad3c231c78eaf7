use sea_orm::ConnectOptions;

use crate::{
  clock::{Clock, SystemClock},
  config::Config,
  identity::{IdentityVerifier, RemoteIdentity, Unconfigured},
  notify::{LogSink, NotificationSink, TelegramSink},
  payment::{PaymentGateway, SandboxGateway},
  prelude::*,
  sv,
};

/// External capabilities the services depend on.
pub struct Collaborators {
  pub clock: Arc<dyn Clock>,
  pub identity: Arc<dyn IdentityVerifier>,
  pub payments: Arc<dyn PaymentGateway>,
  pub notifier: Arc<dyn NotificationSink>,
}

impl Collaborators {
  pub fn from_config(config: &Config) -> anyhow::Result<Self> {
    let identity: Arc<dyn IdentityVerifier> = match &config.identity_url {
      Some(url) => {
        Arc::new(RemoteIdentity::new(url.clone(), config.identity_cache_ttl)?)
      }
      None => {
        warn!("IDENTITY_URL not set, authenticated routes will answer 503");
        Arc::new(Unconfigured)
      }
    };

    let notifier: Arc<dyn NotificationSink> = match &config.telegram {
      Some(telegram) if !telegram.admins.is_empty() => {
        Arc::new(TelegramSink::new(&telegram.token, telegram.admins.clone()))
      }
      _ => {
        warn!("No Telegram admins configured, notifications go to the log");
        Arc::new(LogSink)
      }
    };

    warn!("Payments are simulated by the sandbox gateway");

    Ok(Self {
      clock: Arc::new(SystemClock),
      identity,
      payments: Arc::new(SandboxGateway::new(config.payment_delay)),
      notifier,
    })
  }
}

pub struct Services<'a> {
  pub user: sv::User<'a>,
  pub trial: sv::Trial<'a>,
  pub checkout: sv::Checkout<'a>,
  pub contact: sv::Contact<'a>,
}

pub struct AppState {
  pub db: DatabaseConnection,
  pub config: Config,
  pub catalog: sv::Catalog,
  pub clock: Arc<dyn Clock>,
  pub identity: Arc<dyn IdentityVerifier>,
  pub payments: Arc<dyn PaymentGateway>,
  pub notifier: Arc<dyn NotificationSink>,
}

impl AppState {
  pub async fn connect(config: Config) -> anyhow::Result<Self> {
    let collaborators = Collaborators::from_config(&config)?;

    info!("Connecting to database...");
    let db = connect_db(&config.database_url).await?;

    Ok(Self::from_parts(db, config, collaborators))
  }

  pub fn from_parts(
    db: DatabaseConnection,
    config: Config,
    collaborators: Collaborators,
  ) -> Self {
    let Collaborators { clock, identity, payments, notifier } = collaborators;
    let catalog =
      sv::Catalog::standard(config.app_url.clone(), config.trial_days);

    Self { db, config, catalog, clock, identity, payments, notifier }
  }

  pub fn sv(&self) -> Services<'_> {
    Services {
      user: sv::User::new(&self.db, self.clock.as_ref()),
      trial: sv::Trial::new(self),
      checkout: sv::Checkout::new(&self.catalog),
      contact: sv::Contact::new(self),
    }
  }
}

/// Connects and brings the schema up to date.
pub async fn connect_db(url: &str) -> anyhow::Result<DatabaseConnection> {
  let mut options = ConnectOptions::new(url);
  options.sqlx_logging(false);
  if url.contains(":memory:") {
    // every pooled connection would get its own empty database
    options.max_connections(1);
  }

  let db = Database::connect(options)
    .await
    .context("Failed to connect to database")?;

  info!("Running migrations...");
  Migrator::up(&db, None).await.context("Failed to run migrations")?;

  Ok(db)
}
