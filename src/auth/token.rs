//! Signed session tokens.
//!
//! A token is an HS256 JWT carrying the user id and role. It expires a fixed
//! number of seconds after issuance and cannot be refreshed or revoked.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::Caller;
use crate::db::Role;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub id: i64,
    pub role: Role,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("signing secret must not be empty")]
    EmptySecret,
    #[error("token has expired")]
    Expired,
    #[error("token lifetime of {0}s overflows the expiry timestamp")]
    ExpiryOverflow(i64),
    #[error("invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
}

#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_secs: i64,
}

impl TokenService {
    pub fn new(secret: &str, ttl_secs: i64) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::EmptySecret);
        }

        // Expiry is checked against an explicit clock in `verify_at`
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl_secs,
        })
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    pub fn issue(&self, id: i64, role: Role) -> Result<String, TokenError> {
        self.issue_at(id, role, Utc::now().timestamp())
    }

    /// Issue a token as if the current time were `now`
    pub fn issue_at(&self, id: i64, role: Role, now: i64) -> Result<String, TokenError> {
        let exp = now
            .checked_add(self.ttl_secs)
            .ok_or(TokenError::ExpiryOverflow(self.ttl_secs))?;
        let claims = Claims {
            id,
            role,
            iat: now,
            exp,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<Caller, TokenError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// Verify signature and structure, then expiry against `now` with no leeway
    pub fn verify_at(&self, token: &str, now: i64) -> Result<Caller, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        if now >= data.claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(Caller {
            id: data.claims.id,
            role: data.claims.role,
        })
    }
}
