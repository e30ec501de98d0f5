//! HS256 access and refresh tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use estate_desk_core::{EmployeeId, Role, UserId};

use super::AuthError;
use crate::config::JwtConfig;
use crate::models::user::User;

/// Which of the pair a token is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims carried by both token types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID.
    pub sub: UserId,
    pub email: String,
    pub role: Role,
    pub employee_id: Option<EmployeeId>,
    pub typ: TokenType,
    pub iat: i64,
    pub exp: i64,
}

/// A freshly issued access/refresh pair.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

/// Signs and verifies tokens with the configured secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    #[must_use]
    pub fn new(config: &JwtConfig) -> Self {
        let secret = config.secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            access_ttl: Duration::minutes(config.access_ttl_minutes),
            refresh_ttl: Duration::days(config.refresh_ttl_days),
        }
    }

    /// Issue an access/refresh pair for `user`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenEncoding` if signing fails.
    pub fn issue(&self, user: &User) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access_token: self.sign(user, TokenType::Access, self.access_ttl)?,
            refresh_token: self.sign(user, TokenType::Refresh, self.refresh_ttl)?,
            token_type: "Bearer",
            expires_in: self.access_ttl.num_seconds(),
        })
    }

    fn sign(&self, user: &User, typ: TokenType, ttl: Duration) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id,
            email: user.email.as_str().to_owned(),
            role: user.role,
            employee_id: user.employee_id,
            typ,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(AuthError::TokenEncoding)
    }

    /// Verify an access token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` on a bad signature, expiry or a
    /// refresh token.
    pub fn verify_access(&self, token: &str) -> Result<Claims, AuthError> {
        self.verify(token, TokenType::Access)
    }

    /// Verify a refresh token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` on a bad signature, expiry or an
    /// access token.
    pub fn verify_refresh(&self, token: &str) -> Result<Claims, AuthError> {
        self.verify(token, TokenType::Refresh)
    }

    fn verify(&self, token: &str, expected: TokenType) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let claims = match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(decoded) => decoded.claims,
            Err(e) => {
                match e.kind() {
                    ErrorKind::ExpiredSignature => tracing::debug!("expired token"),
                    _ => tracing::debug!(error = %e, "token validation failed"),
                }
                return Err(AuthError::InvalidToken);
            }
        };

        if claims.typ != expected {
            return Err(AuthError::InvalidToken);
        }
        Ok(claims)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use estate_desk_core::Email;
    use secrecy::SecretString;

    use super::*;

    fn service(access_ttl_minutes: i64) -> TokenService {
        TokenService::new(&JwtConfig {
            secret: SecretString::from("x9#Lq2!vR7@mZ4$wK8^pN3&tB6*yH1(c".to_owned()),
            access_ttl_minutes,
            refresh_ttl_days: 7,
        })
    }

    fn user() -> User {
        User {
            id: UserId::new(5),
            email: Email::parse("ana@example.com").unwrap(),
            role: Role::Advisor,
            employee_id: Some(EmployeeId::new(9)),
            active: true,
            created_at: Utc::now(),
            last_login_at: None,
        }
    }

    #[test]
    fn test_access_token_round_trip() {
        let tokens = service(30);
        let pair = tokens.issue(&user()).unwrap();
        assert_eq!(pair.expires_in, 1800);

        let claims = tokens.verify_access(&pair.access_token).unwrap();
        assert_eq!(claims.sub, UserId::new(5));
        assert_eq!(claims.role, Role::Advisor);
        assert_eq!(claims.employee_id, Some(EmployeeId::new(9)));
    }

    #[test]
    fn test_token_types_are_not_interchangeable() {
        let tokens = service(30);
        let pair = tokens.issue(&user()).unwrap();
        assert!(tokens.verify_access(&pair.refresh_token).is_err());
        assert!(tokens.verify_refresh(&pair.access_token).is_err());
        assert!(tokens.verify_refresh(&pair.refresh_token).is_ok());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let tokens = service(-5);
        let pair = tokens.issue(&user()).unwrap();
        assert!(matches!(
            tokens.verify_access(&pair.access_token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let pair = service(30).issue(&user()).unwrap();
        let other = TokenService::new(&JwtConfig {
            secret: SecretString::from("a different secret of enough length!!".to_owned()),
            access_ttl_minutes: 30,
            refresh_ttl_days: 7,
        });
        assert!(other.verify_access(&pair.access_token).is_err());
        assert!(other.verify_access("not-a-jwt").is_err());
    }
}
