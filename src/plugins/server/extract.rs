//! Request extractors that reject with the crate's JSON error body.

use axum::{
  Json,
  extract::{FromRequest, FromRequestParts, Query, Request},
  http::{header, request::Parts},
};
use serde::de::DeserializeOwned;

use crate::{entity::user, identity::Identity, prelude::*, state::AppState};

/// JSON body; malformed input is a 400.
pub struct Payload<T>(pub T);

impl<S, T> FromRequest<S> for Payload<T>
where
  T: DeserializeOwned,
  S: Send + Sync,
{
  type Rejection = Error;

  async fn from_request(req: Request, state: &S) -> Result<Self> {
    let Json(value) = Json::<T>::from_request(req, state)
      .await
      .map_err(|rejection| Error::Validation(rejection.body_text()))?;
    Ok(Self(value))
  }
}

/// Query string; malformed input is a 400.
pub struct Params<T>(pub T);

impl<S, T> FromRequestParts<S> for Params<T>
where
  T: DeserializeOwned,
  S: Send + Sync,
{
  type Rejection = Error;

  async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
    let Query(value) = Query::<T>::from_request_parts(parts, state)
      .await
      .map_err(|rejection| Error::Validation(rejection.body_text()))?;
    Ok(Self(value))
  }
}

fn bearer(parts: &Parts) -> Result<&str> {
  let header = parts
    .headers
    .get(header::AUTHORIZATION)
    .and_then(|value| value.to_str().ok())
    .ok_or_else(|| Error::Unauthorized("Missing authorization header".into()))?;

  let token = header.strip_prefix("Bearer ").ok_or_else(|| {
    Error::Unauthorized("Expected `Authorization: Bearer <token>`".into())
  })?;

  let token = token.trim();
  if token.is_empty() {
    return Err(Error::Unauthorized("Empty bearer token".into()));
  }

  Ok(token)
}

/// A caller whose bearer token the identity provider accepted.
pub struct Verified(pub Identity);

impl FromRequestParts<Arc<AppState>> for Verified {
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    app: &Arc<AppState>,
  ) -> Result<Self> {
    if !app.identity.is_available() {
      return Err(Error::IdentityUnavailable);
    }

    let token = bearer(parts)?;
    let identity = app.identity.verify_id_token(token).await?;
    Ok(Self(identity))
  }
}

/// A verified caller that also has a local user row.
pub struct AuthUser(pub user::Model);

impl FromRequestParts<Arc<AppState>> for AuthUser {
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    app: &Arc<AppState>,
  ) -> Result<Self> {
    let Verified(identity) = Verified::from_request_parts(parts, app).await?;

    let user = app
      .sv()
      .user
      .by_uid(&identity.uid)
      .await?
      .ok_or(Error::UserNotFound)?;

    Ok(Self(user))
  }
}
