//! Access tokens.
//!
//! Sessions are owned by the portal's account service; this API only
//! verifies the HS256 tokens it hands out. [`issue_access_token`] mints the
//! same shape for integration tests and local tooling.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use portal_core::types::DbId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issuer written into, and required of, every access token.
pub const DEFAULT_ISSUER: &str = "plumbers-portal";

const DEFAULT_ACCESS_EXPIRY_MINS: i64 = 60;

/// Payload of a portal access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccessClaims {
    /// User id.
    pub sub: DbId,
    /// One of the names in `portal_core::roles`. Unknown roles pass
    /// verification and are turned away by the role gates.
    pub role: String,
    pub iss: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    /// Lifetime of tokens from [`issue_access_token`].
    pub access_token_expiry_mins: i64,
}

impl JwtConfig {
    /// | Env Var                  | Required | Default          |
    /// |--------------------------|----------|------------------|
    /// | `JWT_SECRET`             | **yes**  | --               |
    /// | `JWT_ISSUER`             | no       | `plumbers-portal`|
    /// | `JWT_ACCESS_EXPIRY_MINS` | no       | `60`             |
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is missing or empty, or the expiry is not an
    /// integer.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "JWT_SECRET must not be empty");

        let issuer = std::env::var("JWT_ISSUER").unwrap_or_else(|_| DEFAULT_ISSUER.to_string());

        let access_token_expiry_mins: i64 = std::env::var("JWT_ACCESS_EXPIRY_MINS")
            .unwrap_or_else(|_| DEFAULT_ACCESS_EXPIRY_MINS.to_string())
            .parse()
            .expect("JWT_ACCESS_EXPIRY_MINS must be a valid i64");

        Self {
            secret,
            issuer,
            access_token_expiry_mins,
        }
    }
}

/// Mint a signed access token for `user_id` acting as `role`.
pub fn issue_access_token(
    user_id: DbId,
    role: &str,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();

    let claims = AccessClaims {
        sub: user_id,
        role: role.to_string(),
        iss: config.issuer.clone(),
        exp: now + config.access_token_expiry_mins * 60,
        iat: now,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Check signature, expiry and issuer, returning the claims.
pub fn verify_access_token(
    token: &str,
    config: &JwtConfig,
) -> Result<AccessClaims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::default();
    validation.set_issuer(&[config.issuer.as_str()]);

    let data = decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}
