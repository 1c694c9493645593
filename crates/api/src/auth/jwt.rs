//! JWT access-token generation and validation.
//!
//! Access tokens are HS256-signed JWTs whose subject is the Refly user ID.
//! Tokens are issued by the account service; this server only validates
//! them. [`generate_access_token`] exists for tooling and tests.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ConfigError;

/// JWT claims embedded in every access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject: the user's uid.
    pub sub: String,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Unique token identifier for audit.
    pub jti: String,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC-SHA256 secret used to sign and verify tokens.
    pub secret: String,
    /// Access token lifetime in minutes (default: 15).
    pub access_token_expiry_mins: i64,
}

/// Default access token expiry in minutes.
const DEFAULT_ACCESS_EXPIRY_MINS: i64 = 15;

impl JwtConfig {
    /// Load JWT configuration from environment variables.
    ///
    /// | Env Var                    | Required | Default |
    /// |----------------------------|----------|---------|
    /// | `JWT_SECRET`               | **yes**  | --      |
    /// | `JWT_ACCESS_EXPIRY_MINS`   | no       | `15`    |
    pub fn from_env() -> Result<Self, ConfigError> {
        let secret = std::env::var("JWT_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing { name: "JWT_SECRET" })?;

        let access_token_expiry_mins = match std::env::var("JWT_ACCESS_EXPIRY_MINS") {
            Ok(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: "JWT_ACCESS_EXPIRY_MINS",
                value,
            })?,
            Err(_) => DEFAULT_ACCESS_EXPIRY_MINS,
        };

        Ok(Self {
            secret,
            access_token_expiry_mins,
        })
    }
}

/// Generate an HS256 access token for `uid`.
pub fn generate_access_token(
    uid: &str,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: uid.to_string(),
        exp: now + config.access_token_expiry_mins * 60,
        iat: now,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(), // HS256
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Validate and decode an access token, returning the embedded [`Claims`].
///
/// Validates the signature and expiration.
pub fn validate_token(
    token: &str,
    config: &JwtConfig,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(), // HS256, validates exp
    )?;
    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
        }
    }

    #[test]
    fn test_generate_and_validate_access_token() {
        let config = test_config();
        let token = generate_access_token("u-alice", &config).expect("token generation should succeed");

        let claims = validate_token(&token, &config).expect("token validation should succeed");
        assert_eq!(claims.sub, "u-alice");
        assert!(claims.exp > claims.iat);
        assert!(!claims.jti.is_empty());
    }

    #[test]
    fn test_expired_token_fails() {
        let config = test_config();

        // Well beyond the default 60-second leeway.
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: "u-alice".to_string(),
            exp: now - 300,
            iat: now - 600,
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .expect("encoding should succeed");

        assert!(validate_token(&token, &config).is_err());
    }

    #[test]
    fn test_different_secrets_fail() {
        let config_a = JwtConfig {
            secret: "secret-alpha".to_string(),
            access_token_expiry_mins: 15,
        };
        let config_b = JwtConfig {
            secret: "secret-bravo".to_string(),
            access_token_expiry_mins: 15,
        };

        let token = generate_access_token("u-alice", &config_a).expect("token generation should succeed");

        assert!(
            validate_token(&token, &config_b).is_err(),
            "token signed with a different secret must fail"
        );
    }
}
