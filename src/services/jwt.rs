// JWT issuing and verification (HS256).

use crate::models::auth::{Claims, TokenType, User, UserRole};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

pub const REFRESH_TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Error, Debug)]
pub enum JwtError {
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("expected a {expected:?} token")]
    WrongTokenType { expected: TokenType },
}

/// Identity data embedded in issued tokens.
#[derive(Debug, Clone)]
pub struct TokenSubject {
    pub id: Uuid,
    pub role: UserRole,
    pub email: String,
    pub name: String,
}

impl From<&User> for TokenSubject {
    fn from(user: &User) -> Self {
        TokenSubject {
            id: user.id,
            role: user.role,
            email: user.email.clone(),
            name: user.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct JwtKeys {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl JwtKeys {
    /// Refresh tokens use their own secret when one is configured, otherwise the access secret.
    pub fn new(secret: &str, refresh_secret: Option<&str>, access_ttl: Duration) -> Self {
        let refresh_secret = refresh_secret.unwrap_or(secret);
        Self {
            access_encoding: EncodingKey::from_secret(secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(refresh_secret.as_bytes()),
            access_ttl,
            refresh_ttl: REFRESH_TOKEN_TTL,
        }
    }

    pub fn create_access_token(&self, subject: &TokenSubject) -> Result<String, JwtError> {
        self.create_token(subject, TokenType::Access, self.access_ttl)
    }

    pub fn create_refresh_token(&self, subject: &TokenSubject) -> Result<String, JwtError> {
        self.create_token(subject, TokenType::Refresh, self.refresh_ttl)
    }

    pub fn create_token_pair(&self, subject: &TokenSubject) -> Result<TokenPair, JwtError> {
        Ok(TokenPair {
            access_token: self.create_access_token(subject)?,
            refresh_token: self.create_refresh_token(subject)?,
        })
    }

    pub fn create_token(
        &self,
        subject: &TokenSubject,
        token_type: TokenType,
        ttl: Duration,
    ) -> Result<String, JwtError> {
        let now = Utc::now().timestamp().max(0) as usize;
        let claims = Claims {
            sub: subject.id.to_string(),
            role: subject.role,
            email: subject.email.clone(),
            name: subject.name.clone(),
            token_type,
            iat: now,
            exp: now + ttl.as_secs() as usize,
        };
        let key = match token_type {
            TokenType::Access => &self.access_encoding,
            TokenType::Refresh => &self.refresh_encoding,
        };
        Ok(encode(&Header::default(), &claims, key)?)
    }

    /// Checks signature, expiry, and that the token is of the expected kind.
    pub fn verify(&self, token: &str, expected: TokenType) -> Result<Claims, JwtError> {
        let key = match expected {
            TokenType::Access => &self.access_decoding,
            TokenType::Refresh => &self.refresh_decoding,
        };
        let data = decode::<Claims>(token, key, &Validation::new(Algorithm::HS256))?;
        if data.claims.token_type != expected {
            return Err(JwtError::WrongTokenType { expected });
        }
        Ok(data.claims)
    }
}

/// Reads the claims without checking the signature or expiry. Debugging only.
pub fn decode_unverified(token: &str) -> Option<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.required_spec_claims.clear();
    decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
        .ok()
        .map(|data| data.claims)
}

/// True for expired tokens and for anything that can't be decoded.
pub fn is_token_expired(token: &str) -> bool {
    match decode_unverified(token) {
        Some(claims) => (claims.exp as i64) < Utc::now().timestamp(),
        None => true,
    }
}
