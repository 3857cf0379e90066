use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::{distributions::Alphanumeric, Rng};
use sha2::{Digest, Sha256};
use tracing::{debug, error};
use uuid::Uuid;

use crate::config::Config;
use crate::domain::models::{
    auth::{Claims, Principal},
    user::{User, UserRole},
};
use crate::error::AppError;

/// Issues and validates HS256 access tokens.
pub struct AuthService {
    issuer: String,
    expiry_minutes: i64,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthService {
    pub fn new(config: &Config) -> Self {
        let secret = config.jwt_secret_key.as_bytes();
        Self {
            issuer: config.auth_issuer.clone(),
            expiry_minutes: config.jwt_expiry_minutes,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    pub fn issue_token(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            iss: self.issuer.clone(),
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role.as_str().to_string(),
            exp: (now + Duration::minutes(self.expiry_minutes)).timestamp() as usize,
            iat: now.timestamp() as usize,
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            error!("JWT encoding failed: {}", e);
            AppError::Internal
        })
    }

    /// Validates signature, issuer and expiry, then resolves the caller.
    /// A subject that is not a numeric user id is rejected.
    pub fn authenticate(&self, token: &str) -> Result<Principal, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.issuer.as_str()]);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| {
                debug!("JWT validation failed: {}", e);
                AppError::Unauthorized("Invalid or expired token".into())
            })?
            .claims;

        let user_id = claims.sub.parse::<i64>()
            .map_err(|_| AppError::Unauthorized("Token subject is not a user id".into()))?;
        let role = UserRole::parse(&claims.role)
            .ok_or_else(|| AppError::Unauthorized("Token carries an unknown role".into()))?;

        Ok(Principal { user_id, email: claims.email, role })
    }
}

/// Random single-use token for email verification and password resets.
pub fn generate_token() -> String {
    rand::thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect()
}

/// Only this digest is persisted; the raw token travels by email.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
