use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

use super::ServiceError;

/// Session token service (HS256, shared secret).
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_days: i64,
}

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user ID)
    pub sub: String,
    pub email: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

impl JwtService {
    pub fn new(secret: &str, expiry_days: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiry_days,
        }
    }

    /// Session lifetime in seconds, used for the cookie max-age.
    pub fn expiry_seconds(&self) -> i64 {
        self.expiry_days * 24 * 60 * 60
    }

    pub fn generate_token(&self, user_id: &str, email: &str) -> Result<String, ServiceError> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            exp: (now + Duration::days(self.expiry_days)).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Failed to encode token: {}", e)))
    }

    /// Validate signature and expiry. Expired tokens are reported separately
    /// from malformed or forged ones.
    pub fn validate_token(&self, token: &str) -> Result<SessionClaims, ServiceError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => ServiceError::Unauthorized("Token expired".into()),
                _ => ServiceError::Unauthorized("Invalid token".into()),
            })
    }
}
