//! Bearer-token authentication, password hashing and role checks.
//!
//! Tokens are HS256 JWTs carrying the account id, email and role. A token
//! alone is never trusted: [`resolve_current_user`] reloads the account on
//! every request so a deactivation takes effect immediately.

use std::sync::LazyLock;

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand_core::OsRng;
use rca_core::{
  store::RcaStore,
  user::{Enrollment, Registration, Role, User, UserSummary},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
  AppState,
  error::{Error, Result},
};

// ─── Tokens ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
  pub sub:   Uuid,
  pub email: String,
  pub role:  Role,
  pub iat:   i64,
  pub exp:   i64,
}

/// Signs and verifies session tokens with a single shared secret.
#[derive(Clone)]
pub struct TokenIssuer {
  encoding: EncodingKey,
  decoding: DecodingKey,
  ttl:      Duration,
}

impl TokenIssuer {
  pub fn new(secret: &[u8], ttl: Duration) -> Self {
    Self {
      encoding: EncodingKey::from_secret(secret),
      decoding: DecodingKey::from_secret(secret),
      ttl,
    }
  }

  pub fn ttl(&self) -> Duration { self.ttl }

  pub fn issue(&self, user: &User) -> Result<String> { self.issue_at(user, Utc::now()) }

  pub fn issue_at(&self, user: &User, now: DateTime<Utc>) -> Result<String> {
    let claims = Claims {
      sub:   user.user_id,
      email: user.email.clone(),
      role:  user.role,
      iat:   now.timestamp(),
      exp:   (now + self.ttl).timestamp(),
    };
    jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
      .map_err(|e| Error::Internal(format!("token encoding failed: {e}")))
  }

  /// Check signature and expiry. Every failure is `Unauthenticated`.
  pub fn verify(&self, token: &str) -> Result<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)
      .map(|data| data.claims)
      .map_err(|e| {
        debug!(error = %e, "rejected bearer token");
        Error::Unauthenticated
      })
  }
}

// ─── Passwords ───────────────────────────────────────────────────────────────

/// Hash `password` into an argon2id PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| Error::Internal(format!("argon2 error: {e}")))
}

/// `false` for a wrong password and for an unparseable hash alike.
pub fn verify_password(password: &str, hash: &str) -> bool {
  PasswordHash::new(hash)
    .and_then(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed))
    .is_ok()
}

/// Checked against when the email is unknown, so that a miss pays for one
/// argon2 run just like a wrong password does.
static DECOY_HASH: LazyLock<Option<String>> =
  LazyLock::new(|| hash_password("decoy password for unknown accounts").ok());

/// Burn one password verification and report failure.
fn verify_decoy(password: &str) -> bool {
  if let Some(hash) = DECOY_HASH.as_deref() {
    verify_password(password, hash);
  }
  false
}

// ─── Operations ──────────────────────────────────────────────────────────────

/// What a successful login hands back to the client.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
  pub access_token: String,
  pub token_type:   &'static str,
  /// Seconds until `access_token` expires.
  pub expires_in:   i64,
  pub user:         UserSummary,
}

/// Check credentials and issue a token.
///
/// An unknown email and a wrong password fail identically.
pub async fn login<S: RcaStore>(
  store: &S,
  tokens: &TokenIssuer,
  email: &str,
  password: &str,
) -> Result<Session> {
  let Some(credential) = store
    .get_credential(email.trim().to_owned())
    .await
    .map_err(Error::store)?
  else {
    verify_decoy(password);
    debug!("login failed: unknown email");
    return Err(Error::InvalidCredentials);
  };

  if !verify_password(password, &credential.password_hash) {
    debug!(user_id = %credential.user.user_id, "login failed: wrong password");
    return Err(Error::InvalidCredentials);
  }
  if !credential.user.active {
    debug!(user_id = %credential.user.user_id, "login refused: account inactive");
    return Err(Error::AccountInactive);
  }

  let user = credential.user;
  let now = Utc::now();
  store.record_login(user.user_id, now).await.map_err(Error::store)?;
  let access_token = tokens.issue_at(&user, now)?;

  info!(user_id = %user.user_id, role = user.role.as_ref(), "login succeeded");
  Ok(Session {
    access_token,
    token_type: "bearer",
    expires_in: tokens.ttl().num_seconds(),
    user: UserSummary::from(&user),
  })
}

/// Map a bearer token to a live, active account.
pub async fn resolve_current_user<S: RcaStore>(
  store: &S,
  tokens: &TokenIssuer,
  token: &str,
) -> Result<User> {
  let claims = tokens.verify(token)?;
  let user = store
    .get_user(claims.sub)
    .await
    .map_err(Error::store)?
    .ok_or(Error::Unauthenticated)?;
  if !user.active {
    return Err(Error::AccountInactive);
  }
  Ok(user)
}

pub fn require_role(user: &User, allowed: &[Role]) -> Result<()> {
  if allowed.contains(&user.role) {
    Ok(())
  } else {
    Err(Error::Forbidden)
  }
}

/// Create an account.
///
/// While no account exists anyone may register (the bootstrap path).
/// Afterwards the caller must present a token belonging to a supervisor or
/// manager.
pub async fn register_user<S: RcaStore>(
  store: &S,
  tokens: &TokenIssuer,
  registration: Registration,
  bearer: Option<&str>,
) -> Result<User> {
  registration.validate()?;

  let enrollment = if store.count_users().await.map_err(Error::store)? == 0 {
    Enrollment::Bootstrap
  } else {
    let token = bearer.ok_or(Error::Unauthenticated)?;
    let caller = resolve_current_user(store, tokens, token).await?;
    require_role(&caller, Role::ADMINISTRATORS)?;
    Enrollment::Authorized
  };

  let hash = hash_password(&registration.password)?;
  let user = store
    .create_user(registration.into_new_user(hash), enrollment)
    .await
    .map_err(Error::store)?;

  match enrollment {
    Enrollment::Bootstrap => {
      info!(user_id = %user.user_id, role = user.role.as_ref(), "bootstrapped first account");
    }
    Enrollment::Authorized => {
      info!(user_id = %user.user_id, role = user.role.as_ref(), "registered account");
    }
  }
  Ok(user)
}

// ─── Extractors ──────────────────────────────────────────────────────────────

/// The token from an `Authorization: Bearer …` header, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
  let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
  let (scheme, token) = value.split_once(' ')?;
  let token = token.trim();
  (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// The authenticated, active caller.
pub struct CurrentUser(pub User);

/// An authenticated caller holding an administrator role.
pub struct Administrator(pub User);

/// The raw bearer token, when one was sent. Used where authentication is
/// conditional.
pub struct MaybeBearer(pub Option<String>);

impl<S> FromRequestParts<AppState<S>> for CurrentUser
where
  S: RcaStore + Clone + Send + Sync + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let token = bearer_token(&parts.headers).ok_or(Error::Unauthenticated)?;
    resolve_current_user(state.store.as_ref(), &state.tokens, token)
      .await
      .map(CurrentUser)
  }
}

impl<S> FromRequestParts<AppState<S>> for Administrator
where
  S: RcaStore + Clone + Send + Sync + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
    require_role(&user, Role::ADMINISTRATORS)?;
    Ok(Administrator(user))
  }
}

impl<S> FromRequestParts<AppState<S>> for MaybeBearer
where
  S: RcaStore + Clone + Send + Sync + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    Ok(MaybeBearer(bearer_token(&parts.headers).map(str::to_owned)))
  }
}
