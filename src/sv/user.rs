use crate::{clock::Clock, entity::user, prelude::*};

pub struct User<'a> {
  db: &'a DatabaseConnection,
  clock: &'a dyn Clock,
}

impl<'a> User<'a> {
  pub fn new(db: &'a DatabaseConnection, clock: &'a dyn Clock) -> Self {
    Self { db, clock }
  }

  /// Creates the local row for a verified identity; refreshes the email of
  /// an existing one.
  pub async fn register(
    &self,
    uid: &str,
    email: Option<String>,
  ) -> Result<user::Model> {
    if let Some(user) = self.by_uid(uid).await? {
      if email.is_none() || user.email == email {
        return Ok(user);
      }

      let user = user::ActiveModel { email: Set(email), ..user.into() }
        .update(self.db)
        .await?;
      return Ok(user);
    }

    let user = user::ActiveModel {
      uid: Set(uid.to_string()),
      email: Set(email),
      created_at: Set(self.clock.now()),
    };

    info!("Registered user {uid}");
    Ok(user.insert(self.db).await?)
  }

  pub async fn by_uid(&self, uid: &str) -> Result<Option<user::Model>> {
    let user = user::Entity::find_by_id(uid).one(self.db).await?;
    Ok(user)
  }
}
