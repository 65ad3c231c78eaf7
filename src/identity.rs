//! Bearer-token verification against the external identity provider

use std::time::Instant;

use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};

use crate::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Identity {
  pub uid: String,
  #[serde(default)]
  pub email: Option<String>,
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
  /// False when no identity backend is configured.
  fn is_available(&self) -> bool {
    true
  }

  async fn verify_id_token(&self, token: &str) -> Result<Identity>;

  /// Drops stale cached verifications.
  fn gc(&self) {}
}

/// Used when `IDENTITY_URL` is unset: every protected route answers 503.
pub struct Unconfigured;

#[async_trait]
impl IdentityVerifier for Unconfigured {
  fn is_available(&self) -> bool {
    false
  }

  async fn verify_id_token(&self, _token: &str) -> Result<Identity> {
    Err(Error::IdentityUnavailable)
  }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyReq<'a> {
  id_token: &'a str,
}

struct Verified {
  identity: Identity,
  at: Instant,
}

/// Token introspection over HTTP with a short-lived cache of verified
/// tokens.
pub struct RemoteIdentity {
  client: Client,
  endpoint: Url,
  ttl: Duration,
  cache: DashMap<String, Verified>,
}

impl RemoteIdentity {
  pub fn new(endpoint: Url, ttl: Duration) -> anyhow::Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(10))
      .build()
      .context("Failed to build identity client")?;

    Ok(Self { client, endpoint, ttl, cache: DashMap::new() })
  }

  fn cached(&self, token: &str) -> Option<Identity> {
    let entry = self.cache.get(token)?;
    (entry.at.elapsed() < self.ttl).then(|| entry.identity.clone())
  }
}

#[async_trait]
impl IdentityVerifier for RemoteIdentity {
  async fn verify_id_token(&self, token: &str) -> Result<Identity> {
    if let Some(identity) = self.cached(token) {
      return Ok(identity);
    }

    let res = self
      .client
      .post(self.endpoint.clone())
      .json(&VerifyReq { id_token: token })
      .send()
      .await
      .map_err(|err| {
        warn!("Identity service request failed: {err}");
        Error::IdentityUnavailable
      })?;

    match res.status() {
      status if status.is_success() => {}
      StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::BAD_REQUEST => {
        return Err(Error::Unauthorized("Invalid or expired token".into()));
      }
      status => {
        warn!("Identity service answered {status}");
        return Err(Error::IdentityUnavailable);
      }
    }

    let identity: Identity = res.json().await.map_err(|err| {
      warn!("Identity service sent malformed body: {err}");
      Error::IdentityUnavailable
    })?;

    self.cache.insert(
      token.to_string(),
      Verified { identity: identity.clone(), at: Instant::now() },
    );

    Ok(identity)
  }

  fn gc(&self) {
    let ttl = self.ttl;
    self.cache.retain(|_token, verified| verified.at.elapsed() < ttl);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_unconfigured_is_unavailable() {
    let identity = Unconfigured;
    assert!(!identity.is_available());
    assert!(matches!(
      identity.verify_id_token("anything").await,
      Err(Error::IdentityUnavailable)
    ));
  }

  #[tokio::test]
  async fn test_cache_hit_skips_network() {
    // Port 9 (discard) is never reached because the token is cached.
    let identity = RemoteIdentity::new(
      Url::parse("http://127.0.0.1:9/verify").unwrap(),
      Duration::from_secs(60),
    )
    .unwrap();

    let alice = Identity { uid: "alice".into(), email: None };
    identity.cache.insert(
      "tok".into(),
      Verified { identity: alice.clone(), at: Instant::now() },
    );

    assert_eq!(identity.verify_id_token("tok").await.unwrap(), alice);
  }

  #[test]
  fn test_gc_drops_expired_entries() {
    let identity = RemoteIdentity::new(
      Url::parse("http://127.0.0.1:9/verify").unwrap(),
      Duration::ZERO,
    )
    .unwrap();

    identity.cache.insert(
      "tok".into(),
      Verified {
        identity: Identity { uid: "alice".into(), email: None },
        at: Instant::now(),
      },
    );

    identity.gc();
    assert!(identity.cache.is_empty());
  }
}
