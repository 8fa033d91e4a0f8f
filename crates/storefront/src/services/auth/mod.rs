//! Authentication service.
//!
//! Email and password accounts, hashed with Argon2id.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::Deserialize;
use sqlx::PgPool;
use tracing::instrument;

use urban_style_core::Email;

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::User;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Registration form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, alias = "passwordConfirm", alias = "confirmPassword")]
    pub password_confirm: String,
}

/// Login form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Register a new customer account.
    ///
    /// A blank name is stored as no name; the account then displays the
    /// local part of its email.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingField` for a blank email or password.
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password is too short.
    /// Returns `AuthError::PasswordMismatch` if the confirmation differs.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip_all)]
    pub async fn register(&self, form: &RegisterForm) -> Result<User, AuthError> {
        let email = parse_email(&form.email)?;
        if form.password.is_empty() {
            return Err(AuthError::MissingField("Password"));
        }
        validate_password(&form.password)?;
        if form.password != form.password_confirm {
            return Err(AuthError::PasswordMismatch);
        }

        let full_name = form
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty());

        let password_hash = hash_password(&form.password)?;

        let user = self
            .users
            .create_with_password(&email, full_name, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "Account registered");
        Ok(user)
    }

    /// Log in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingField` for a blank email or password.
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip_all)]
    pub async fn login(&self, form: &LoginForm) -> Result<User, AuthError> {
        let email = parse_email(&form.email)?;
        if form.password.is_empty() {
            return Err(AuthError::MissingField("Password"));
        }

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(&form.password, &password_hash)?;

        Ok(user)
    }
}

/// Parse a submitted email, distinguishing blank from malformed.
fn parse_email(raw: &str) -> Result<Email, AuthError> {
    if raw.trim().is_empty() {
        return Err(AuthError::MissingField("Email"));
    }
    Ok(Email::parse(raw)?)
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
