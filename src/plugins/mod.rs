pub mod server;

use std::{sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::state::AppState;

/// A long-running service supervised by [`App`].
#[async_trait::async_trait]
pub trait Plugin: Send + Sync {
  fn name(&self) -> &'static str {
    std::any::type_name::<Self>()
  }

  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()>;
}

pub struct App {
  plugins: Vec<Arc<dyn Plugin>>,
  restart_delay: Duration,
}

impl App {
  pub fn new() -> Self {
    Self { plugins: Vec::new(), restart_delay: Duration::from_secs(5) }
  }

  #[cfg(test)]
  fn restart_delay(mut self, delay: Duration) -> Self {
    self.restart_delay = delay;
    self
  }

  pub fn register<P: Plugin + 'static>(mut self, plugin: P) -> Self {
    self.plugins.push(Arc::new(plugin));
    self
  }

  /// Spawns every plugin and restarts it whenever it stops or panics.
  pub fn run(self, app: Arc<AppState>) -> Vec<tokio::task::JoinHandle<()>> {
    let delay = self.restart_delay;

    self
      .plugins
      .into_iter()
      .map(|plugin| {
        let app = app.clone();

        tokio::spawn(async move {
          let name = plugin.name();
          info!("SYSTEM: Service `{}` initialized", name);

          loop {
            let app = app.clone();
            let plugin = plugin.clone();

            let handle = tokio::spawn(async move { plugin.start(app).await });

            match handle.await {
              Ok(Ok(())) => {
                warn!("Service `{name}` stopped unexpectedly (Ok).");
              }
              Ok(Err(err)) => {
                error!("Service `{name}` crashed with error: {err:#}.");
              }
              Err(join_err) => {
                if join_err.is_cancelled() {
                  info!("Service `{}` shutdown.", name);
                  break;
                } else {
                  error!("Service `{}` PANICKED!", name);
                }
              }
            }

            sleep(delay).await;
            info!("SYSTEM: Restarting service `{}`...", name);
          }
        })
      })
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use super::*;
  use crate::testing;

  struct Flaky(Arc<AtomicUsize>);

  #[async_trait::async_trait]
  impl Plugin for Flaky {
    async fn start(&self, _app: Arc<AppState>) -> anyhow::Result<()> {
      self.0.fetch_add(1, Ordering::SeqCst);
      anyhow::bail!("boom")
    }
  }

  #[tokio::test]
  async fn test_crashed_plugin_is_restarted() {
    let t = testing::app().await;
    let starts = Arc::new(AtomicUsize::new(0));

    let handles = App::new()
      .restart_delay(Duration::from_millis(10))
      .register(Flaky(starts.clone()))
      .run(t.app.clone());
    sleep(Duration::from_millis(200)).await;

    assert!(starts.load(Ordering::SeqCst) >= 3);
    for handle in handles {
      handle.abort();
    }
  }
}
