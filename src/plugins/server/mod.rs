mod extract;
mod handlers;

use std::net::SocketAddr;

use axum::{
  Router,
  routing::{get, post},
};
use tower::ServiceBuilder;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{
  cors::{Any, CorsLayer},
  trace::TraceLayer,
};

use crate::{prelude::*, state::AppState};

pub fn routes() -> Router<Arc<AppState>> {
  Router::new()
    .route("/health", get(handlers::health))
    .route("/account/register", post(handlers::register))
    .route(
      "/trial/start",
      get(handlers::trial_eligibility).post(handlers::start_trial),
    )
    .route(
      "/trial/status",
      get(handlers::trial_status).post(handlers::trial_action),
    )
    .route(
      "/trial/upgrade",
      get(handlers::upgrade_offer).post(handlers::upgrade),
    )
    .route("/trial/usage", post(handlers::record_usage))
    .route("/trial/extensions", get(handlers::trial_extensions))
    .route("/pricing/plans", get(handlers::list_plans))
    .route("/checkout/create-session", post(handlers::create_checkout))
    .route("/contact/submit", post(handlers::submit_contact))
}

pub struct Plugin;

#[async_trait]
impl super::Plugin for Plugin {
  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()> {
    let governor_conf = Arc::new(
      GovernorConfigBuilder::default()
        .per_second(2)
        .burst_size(100)
        .finish()
        .context("Failed to build rate limiter config")?,
    );

    let limiter = governor_conf.limiter().clone();
    let identity = app.identity.clone();
    let port = app.config.port;

    let router = routes()
      .layer(
        ServiceBuilder::new()
          .layer(TraceLayer::new_for_http())
          .layer(GovernorLayer::new(governor_conf))
          .layer(
            CorsLayer::new()
              .allow_origin(Any)
              .allow_methods(Any)
              .allow_headers(Any),
          ),
      )
      .with_state(app)
      .into_make_service_with_connect_info::<SocketAddr>();

    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = tokio::net::TcpListener::bind(addr)
      .await
      .with_context(|| format!("Failed to bind {addr}"))?;
    info!("HTTP Server listening on {addr}");

    let housekeeping = async {
      loop {
        tokio::time::sleep(Duration::from_secs(60)).await;
        limiter.retain_recent();
        identity.gc();
      }
    };

    let server = async {
      axum::serve(listener, router).await.context("Axum server error")
    };

    tokio::select! {
      result = server => {
        match &result {
          Ok(_) => info!("Server stopped gracefully"),
          Err(err) => error!("Server stopped with error: {err}"),
        }
        result
      }
      _ = housekeeping => {
        error!("Housekeeping loop stopped unexpectedly!");
        Ok(())
      }
    }
  }
}
