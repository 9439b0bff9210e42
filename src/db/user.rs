use log::*;

use chrono::NaiveDateTime;

use tokio_postgres::{
  Row,
  error::{DbError, SqlState},
};

use crate::error::*;
use crate::models::*;

use crate::db::*;
use crate::db::util::*;

#[derive(Clone)]
pub struct UserService {
  // gets
  user_by_email: VersionedStatement,
  user_by_nickname: VersionedStatement,

  // stores
  insert_user: VersionedStatement,
  register_user: VersionedStatement,

  // updates
  touch_last_seen: VersionedStatement,
  update_profile: VersionedStatement,
}

lazy_static! {
  static ref USER_COLUMNS: ColumnMappers = {
    ColumnMappers {
      table_name: "users",
      columns: vec![
        column("id"),
        column("nickname"),
        column("email"),
        column("about_me"),
        column("last_seen"),
      ],
    }
  };
}

pub const NICKNAME_IN_USE: &str = "This nickname is already in use. Please choose another one.";

const NICKNAME_CONSTRAINT: &str = "users_nickname_key";

/// Losing a race for a nickname is the caller's problem (422), not a 500.
fn nickname_conflict(err: Error) -> Error {
  if let Error::PgError { ref source } = err {
    if source.code() == Some(&SqlState::UNIQUE_VIOLATION) {
      let constraint = std::error::Error::source(source)
        .and_then(|cause| cause.downcast_ref::<DbError>())
        .and_then(DbError::constraint);
      if constraint == Some(NICKNAME_CONSTRAINT) {
        debug!("nickname conflict: {}", source);
        return Error::unprocessable(NICKNAME_IN_USE);
      }
    }
  }
  err
}

fn user_from_row(row: &Row) -> User {
  User {
    id: row.get(0),
    nickname: row.get(1),
    email: row.get(2),
    about_me: row.get(3),
    last_seen: row.get(4),
  }
}

fn user_from_opt_row(row: &Option<Row>) -> Option<User> {
  row.as_ref().map(user_from_row)
}

impl UserService {
  pub fn new(cl: SharedClient) -> Result<UserService> {
    let select = USER_COLUMNS.build_select_query();
    let columns = USER_COLUMNS.get_columns(None);
    // Build user_by_* queries
    let user_by_email = VersionedStatement::new(cl.clone(),
        &format!(r#"{} WHERE email = $1"#, select))?;
    let user_by_nickname = VersionedStatement::new(cl.clone(),
        &format!(r#"{} WHERE nickname = $1"#, select))?;

    let insert_user = VersionedStatement::new(cl.clone(),
        &USER_COLUMNS.build_insert_returning("id"))?;
    // New user plus its self-follow edge, in one statement.
    let register_user = VersionedStatement::new(cl.clone(),
        &format!(r#"WITH new_user AS ({}),
        self_follow AS (
          INSERT INTO followers(follower_id, followed_id) SELECT id, id FROM new_user
        )
        SELECT {} FROM new_user"#,
        USER_COLUMNS.build_insert_returning("id"), columns))?;

    let touch_last_seen = VersionedStatement::new(cl.clone(),
        &format!(r#"UPDATE users SET last_seen = $2 WHERE id = $1 RETURNING {}"#, columns))?;
    let update_profile = VersionedStatement::new(cl.clone(),
        &format!(r#"UPDATE users SET nickname = $2, about_me = $3 WHERE id = $1 RETURNING {}"#,
        columns))?;

    Ok(UserService {
      user_by_email,
      user_by_nickname,

      insert_user,
      register_user,

      touch_last_seen,
      update_profile,
    })
  }

  pub async fn prepare(&self) -> Result<()> {
    self.user_by_email.prepare().await?;
    self.user_by_nickname.prepare().await?;

    self.insert_user.prepare().await?;
    self.register_user.prepare().await?;

    self.touch_last_seen.prepare().await?;
    self.update_profile.prepare().await?;
    Ok(())
  }

  pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
    let row = self.user_by_email.query_opt(&[&email]).await?;
    Ok(user_from_opt_row(&row))
  }

  pub async fn get_by_nickname(&self, nickname: &str) -> Result<Option<User>> {
    let row = self.user_by_nickname.query_opt(&[&nickname]).await?;
    Ok(user_from_opt_row(&row))
  }

  pub async fn nickname_taken(&self, nickname: &str) -> Result<bool> {
    Ok(self.user_by_nickname.query_opt(&[&nickname]).await?.is_some())
  }

  /// First free nickname among `nickname`, `nickname2`, `nickname3`, ...
  pub async fn make_unique_nickname(&self, nickname: &str) -> Result<String> {
    for candidate in nickname_candidates(nickname) {
      if !self.nickname_taken(&candidate).await? {
        return Ok(candidate);
      }
      debug!("nickname '{}' is taken.", candidate);
    }
    Err(Error::InternalServerError)
  }

  /// Plain insert; the new user follows nobody.
  pub async fn create(&self, user: &NewUser) -> Result<User> {
    let row = self.insert_user.query_one(&[
        &user.nickname, &user.email, &"", &now(),
      ]).await.map_err(nickname_conflict)?;
    Ok(user_from_row(&row))
  }

  /// Insert a user that follows itself, so its own posts show up in its feed.
  pub async fn register(&self, user: &NewUser) -> Result<User> {
    let row = self.register_user.query_one(&[
        &user.nickname, &user.email, &"", &now(),
      ]).await.map_err(nickname_conflict)?;
    let user = user_from_row(&row);
    info!("registered user id={} nickname={}", user.id, user.nickname);
    Ok(user)
  }

  pub async fn touch_last_seen(&self, id: i32) -> Result<Option<User>> {
    let row = self.touch_last_seen.query_opt(&[&id, &now()]).await?;
    Ok(user_from_opt_row(&row))
  }

  pub async fn update_profile(&self, id: i32, nickname: &str, about_me: &str) -> Result<Option<User>> {
    let row = self.update_profile.query_opt(&[&id, &nickname, &about_me]).await
      .map_err(nickname_conflict)?;
    Ok(user_from_opt_row(&row))
  }
}

fn now() -> NaiveDateTime {
  chrono::Utc::now().naive_utc()
}
