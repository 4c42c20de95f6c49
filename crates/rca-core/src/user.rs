//! User accounts.
//!
//! [`User`] never carries the password hash, so it is always safe to
//! serialise. The hash travels separately inside a [`Credential`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::EnumString,
  strum::AsRefStr,
  strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
  Maintainer,
  Supervisor,
  Manager,
}

impl Role {
  /// Roles allowed to administer accounts.
  pub const ADMINISTRATORS: &'static [Role] = &[Role::Supervisor, Role::Manager];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub user_id:       Uuid,
  pub username:      String,
  pub email:         String,
  pub full_name:     Option<String>,
  pub role:          Role,
  /// Home area of the account holder.
  pub area:          Option<String>,
  pub active:        bool,
  pub created_at:    DateTime<Utc>,
  pub last_login_at: Option<DateTime<Utc>>,
}

/// The compact account view returned alongside a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
  pub user_id:   Uuid,
  pub full_name: Option<String>,
  pub email:     String,
  pub role:      Role,
  pub area:      Option<String>,
}

impl From<&User> for UserSummary {
  fn from(u: &User) -> Self {
    Self {
      user_id:   u.user_id,
      full_name: u.full_name.clone(),
      email:     u.email.clone(),
      role:      u.role,
      area:      u.area.clone(),
    }
  }
}

/// An account together with its stored password hash.
#[derive(Clone)]
pub struct Credential {
  pub user:          User,
  /// PHC string, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

impl fmt::Debug for Credential {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Credential")
      .field("user", &self.user)
      .field("password_hash", &"<redacted>")
      .finish()
  }
}

/// A registration request as submitted by a client, plaintext password
/// included. Hash it with the server's hasher before it goes anywhere else.
#[derive(Clone, Deserialize)]
pub struct Registration {
  pub username:  String,
  pub email:     String,
  pub full_name: Option<String>,
  pub password:  String,
  pub role:      Role,
  pub area:      Option<String>,
}

impl fmt::Debug for Registration {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Registration")
      .field("username", &self.username)
      .field("email", &self.email)
      .field("full_name", &self.full_name)
      .field("password", &"<redacted>")
      .field("role", &self.role)
      .field("area", &self.area)
      .finish()
  }
}

impl Registration {
  pub fn validate(&self) -> Result<()> {
    let username = self.username.trim();
    if username.is_empty() {
      return Err(Error::invalid("username", "must not be blank"));
    }
    if username.chars().count() > 50 {
      return Err(Error::invalid("username", "must be at most 50 characters"));
    }
    let email = self.email.trim();
    match email.split_once('@') {
      Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
      _ => return Err(Error::invalid("email", "must be an email address")),
    }
    if self.password.is_empty() {
      return Err(Error::invalid("password", "must not be empty"));
    }
    Ok(())
  }

  /// Replace the plaintext password with `password_hash`.
  pub fn into_new_user(self, password_hash: String) -> NewUser {
    NewUser {
      username: self.username.trim().to_owned(),
      email: self.email.trim().to_owned(),
      full_name: self.full_name,
      password_hash,
      role: self.role,
      area: self.area,
    }
  }
}

/// Input to [`crate::store::RcaStore::create_user`].
#[derive(Clone)]
pub struct NewUser {
  pub username:      String,
  pub email:         String,
  pub full_name:     Option<String>,
  pub password_hash: String,
  pub role:          Role,
  pub area:          Option<String>,
}

impl fmt::Debug for NewUser {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("NewUser")
      .field("username", &self.username)
      .field("email", &self.email)
      .field("role", &self.role)
      .finish_non_exhaustive()
  }
}

/// How an account is being created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enrollment {
  /// First-run setup. The store only accepts it while no account exists.
  Bootstrap,
  /// An authenticated administrator is creating the account.
  Authorized,
}
