//! HS256 access tokens for newsroom sessions.
//!
//! A token names one person inside one course. The display name in `sub` is
//! also the name written to `stories.locked_by`, so it must match what the
//! editor shows other journalists.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Token lifetime when `JWT_ACCESS_EXPIRY_MINS` is unset: one class day.
const DEFAULT_ACCESS_EXPIRY_MINS: i64 = 8 * 60;

/// Payload of an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Display name of the journalist, trainer or guest editor.
    pub sub: String,
    pub course_id: String,
    /// `journalist`, `trainer` or `guest_editor`.
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_name: Option<String>,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

/// Who a token is minted for.
#[derive(Debug, Clone)]
pub struct TokenSubject<'a> {
    pub name: &'a str,
    pub course_id: &'a str,
    pub role: &'a str,
    pub publication_name: Option<&'a str>,
}

impl Claims {
    fn issue(subject: &TokenSubject<'_>, lifetime_mins: i64) -> Self {
        let iat = Utc::now().timestamp();
        Self {
            sub: subject.name.to_owned(),
            course_id: subject.course_id.to_owned(),
            role: subject.role.to_owned(),
            publication_name: subject.publication_name.map(str::to_owned),
            exp: iat + lifetime_mins * 60,
            iat,
            jti: Uuid::new_v4().to_string(),
        }
    }
}

/// Signing secret and token lifetime.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expiry_mins: i64,
}

impl JwtConfig {
    /// Read `JWT_SECRET` (required) and `JWT_ACCESS_EXPIRY_MINS` (default 480).
    ///
    /// # Panics
    ///
    /// Panics when the secret is missing or empty, or the expiry is not an
    /// integer.
    pub fn from_env() -> Self {
        let secret = std::env::var("JWT_SECRET").unwrap_or_default();
        assert!(!secret.is_empty(), "JWT_SECRET must be set and non-empty");

        let access_token_expiry_mins = match std::env::var("JWT_ACCESS_EXPIRY_MINS") {
            Ok(raw) => raw
                .parse()
                .expect("JWT_ACCESS_EXPIRY_MINS must be a whole number of minutes"),
            Err(_) => DEFAULT_ACCESS_EXPIRY_MINS,
        };

        Self {
            secret,
            access_token_expiry_mins,
        }
    }

    fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(self.secret.as_bytes())
    }

    fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(self.secret.as_bytes())
    }
}

/// Mint a signed access token for `subject`.
pub fn generate_access_token(
    subject: &TokenSubject<'_>,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims::issue(subject, config.access_token_expiry_mins);
    encode(&Header::default(), &claims, &config.encoding_key())
}

/// Check signature and expiry, returning the claims.
pub fn validate_token(
    token: &str,
    config: &JwtConfig,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(token, &config.decoding_key(), &Validation::default()).map(|data| data.claims)
}
