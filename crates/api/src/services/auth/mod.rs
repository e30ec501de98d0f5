//! Authentication service.
//!
//! Email/password login backed by Argon2id hashes, with stateless JWT
//! bearer tokens for every subsequent request.

mod error;
pub mod tokens;

pub use error::AuthError;
pub use tokens::{Claims, TokenPair, TokenService, TokenType};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;

use estate_desk_core::{Email, UserId};

use crate::db::users::UserRepository;
use crate::models::user::User;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length.
const MAX_PASSWORD_LENGTH: usize = 100;

/// Argon2id hash of a random string, verified against when the email is
/// unknown so both failure paths cost the same.
const DUMMY_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$\
     Dv0l3Pu+1o8fWEnYkQ0H+H2mAXi5eTzF6c2CQAVg8l4";

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    tokens: &'a TokenService,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, tokens: &'a TokenService) -> Self {
        Self {
            users: UserRepository::new(pool),
            tokens,
        }
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for an unknown email, a wrong
    /// password or an inactive account.
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, TokenPair), AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let Some((user, password_hash)) = self.users.get_password_hash(&email).await? else {
            let _ = verify_password(password, DUMMY_HASH);
            return Err(AuthError::InvalidCredentials);
        };

        verify_password(password, &password_hash)?;
        if !user.active {
            return Err(AuthError::InvalidCredentials);
        }

        self.users.touch_last_login(user.id).await?;
        let pair = self.tokens.issue(&user)?;
        Ok((user, pair))
    }

    /// Exchange a refresh token for a new pair.
    ///
    /// The account is re-read so role changes and deactivation take effect.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the token is invalid or the
    /// account no longer exists or is inactive.
    pub async fn refresh(&self, refresh_token: &str) -> Result<(User, TokenPair), AuthError> {
        let claims = self.tokens.verify_refresh(refresh_token)?;
        let user = self
            .users
            .get_by_id(claims.sub)
            .await?
            .filter(|u| u.active)
            .ok_or(AuthError::InvalidToken)?;

        let pair = self.tokens.issue(&user)?;
        Ok((user, pair))
    }

    /// The active account behind a verified token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the account is gone or inactive.
    pub async fn current_user(&self, id: UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(id)
            .await?
            .filter(|u| u.active)
            .ok_or(AuthError::InvalidToken)
    }
}

/// Validate password strength: 8 to 100 characters with an uppercase
/// letter, a lowercase letter and a digit.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` naming the first rule broken.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    let length = password.chars().count();
    if length < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if length > MAX_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at most {MAX_PASSWORD_LENGTH} characters"
        )));
    }

    let checks = [
        (char::is_uppercase as fn(char) -> bool, "an uppercase letter"),
        (char::is_lowercase, "a lowercase letter"),
        (|c: char| c.is_ascii_digit(), "a digit"),
    ];
    for (check, what) in checks {
        if !password.chars().any(check) {
            return Err(AuthError::WeakPassword(format!(
                "password must contain {what}"
            )));
        }
    }

    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_password_rules() {
        assert!(validate_password("Secret12").is_ok());
        assert!(validate_password("Sh0rt").is_err());
        assert!(validate_password("alllowercase1").is_err());
        assert!(validate_password("ALLUPPERCASE1").is_err());
        assert!(validate_password("NoDigitsHere").is_err());
        assert!(validate_password(&format!("Aa1{}", "x".repeat(98))).is_err());
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("Secret12").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("Secret12", &hash).is_ok());
        assert!(matches!(
            verify_password("Secret13", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_dummy_hash_parses() {
        assert!(PasswordHash::new(DUMMY_HASH).is_ok());
        assert!(verify_password("anything", DUMMY_HASH).is_err());
    }
}
