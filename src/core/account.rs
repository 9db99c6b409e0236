//! Account business logic - registration, login, sessions and profile updates.
//!
//! Sessions are opaque bearer tokens stored in the `sessions` table. Every
//! authenticated request resolves its token to a fresh user row, so role and
//! store changes are visible immediately.

use crate::{
    entities::{Role, Session, User, session, user},
    errors::{Error, Result},
};
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use chrono::{TimeDelta, Utc};
use sea_orm::{Set, prelude::*};
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// A user together with a freshly issued bearer token.
#[derive(Debug, Clone)]
pub struct SignedIn {
    /// The authenticated user
    pub user: user::Model,
    /// Token to send as `Authorization: Bearer <token>`
    pub token: String,
}

/// Input for `register`
#[derive(Debug, Clone)]
pub struct Registration {
    /// Display name
    pub name: String,
    /// Login email
    pub email: String,
    /// Plain-text password, only held for the duration of the call
    pub password: String,
}

/// Checks the `local@domain.tld` shape without pulling in a full address parser.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !local.is_empty() && !host.is_empty() && !tld.is_empty() && !domain.contains('@')
}

/// Produces an Argon2id PHC string (`$argon2id$v=19$...`) for storage.
///
/// # Errors
/// Returns `PasswordHash` if the hasher rejects its input.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())?;
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// Checks `password` against a stored PHC string. Unparseable digests never match.
#[must_use]
pub fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}

async fn issue_session(
    db: &DatabaseConnection,
    user_id: i64,
    ttl_days: i64,
) -> Result<session::Model> {
    let now = Utc::now();
    let expires_at = TimeDelta::try_days(ttl_days)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| Error::Config {
            message: format!("Session lifetime of {ttl_days} days is out of range"),
        })?;
    session::ActiveModel {
        token: Set(Uuid::new_v4().simple().to_string()),
        user_id: Set(user_id),
        created_at: Set(now),
        expires_at: Set(expires_at),
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Creates a buyer account and signs it in.
///
/// # Errors
/// Returns `InvalidInput` for blank fields, a malformed email, or an email that is
/// already registered.
#[instrument(skip(db, registration), fields(email = %registration.email))]
pub async fn register(
    db: &DatabaseConnection,
    registration: Registration,
    ttl_days: i64,
) -> Result<SignedIn> {
    let name = registration.name.trim();
    let email = registration.email.trim().to_lowercase();
    if name.is_empty() || email.is_empty() || registration.password.is_empty() {
        return Err(Error::invalid_input("All fields are required"));
    }
    if !is_valid_email(&email) {
        return Err(Error::invalid_input("Please use a valid email address"));
    }

    let existing = User::find()
        .filter(user::Column::Email.eq(email.as_str()))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(Error::invalid_input("Email is already registered"));
    }

    let user = user::ActiveModel {
        name: Set(name.to_string()),
        email: Set(email),
        password_digest: Set(hash_password(&registration.password)?),
        role: Set(Role::Buyer),
        address: Set(None),
        phone: Set(None),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let session = issue_session(db, user.id, ttl_days).await?;
    info!(user_id = user.id, "Registered new user");
    Ok(SignedIn {
        user,
        token: session.token,
    })
}

/// Verifies credentials and issues a new session.
///
/// # Errors
/// Returns `Unauthenticated` for an unknown email or a wrong password.
#[instrument(skip(db, password))]
pub async fn login(
    db: &DatabaseConnection,
    email: &str,
    password: &str,
    ttl_days: i64,
) -> Result<SignedIn> {
    let user = User::find()
        .filter(user::Column::Email.eq(email.trim().to_lowercase()))
        .one(db)
        .await?
        .filter(|user| verify_password(password, &user.password_digest))
        .ok_or_else(|| Error::unauthenticated("Invalid credentials"))?;

    let session = issue_session(db, user.id, ttl_days).await?;
    info!(user_id = user.id, "User logged in");
    Ok(SignedIn {
        user,
        token: session.token,
    })
}

/// Resolves a bearer token to the user it belongs to.
///
/// # Errors
/// Returns `Unauthenticated` if the token is unknown or expired, or its user is gone.
pub async fn authenticate(db: &DatabaseConnection, token: &str) -> Result<user::Model> {
    let session = Session::find_by_id(token.to_string())
        .one(db)
        .await?
        .ok_or_else(|| Error::unauthenticated("Invalid or expired token"))?;

    if session.expires_at <= Utc::now() {
        warn!(user_id = session.user_id, "Rejected expired session");
        session.delete(db).await?;
        return Err(Error::unauthenticated("Invalid or expired token"));
    }

    User::find_by_id(session.user_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::unauthenticated("User not found from authentication"))
}

/// Fetches a user by id.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_user_by_id(db: &DatabaseConnection, user_id: i64) -> Result<Option<user::Model>> {
    User::find_by_id(user_id).one(db).await.map_err(Into::into)
}

/// Replaces the user's default shipping address.
///
/// # Errors
/// Returns `InvalidInput` for a blank address and `NotFound` for an unknown user.
#[instrument(skip(db, address))]
pub async fn update_address(
    db: &DatabaseConnection,
    user_id: i64,
    address: &str,
) -> Result<user::Model> {
    let address = address.trim();
    if address.is_empty() {
        return Err(Error::invalid_input("Address is required"));
    }

    let mut user: user::ActiveModel = User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("User", user_id))?
        .into();
    user.address = Set(Some(address.to_string()));
    user.update(db).await.map_err(Into::into)
}
