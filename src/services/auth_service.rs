use async_trait::async_trait;
use bcrypt::verify;
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

use crate::models::auth::{AuthToken, LoginRequest};

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String, // username
    exp: i64,    // expiration timestamp
}

/// Authentication service errors
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Trait defining authentication service operations
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Check the operator's credentials and return a JWT token
    async fn login(&self, request: LoginRequest) -> Result<AuthToken, AuthError>;

    /// Validate a JWT token and return the username it was issued to
    async fn validate_token(&self, token: &str) -> Result<String, AuthError>;
}

/// Single-operator implementation: the account comes from configuration
pub struct AuthServiceImpl {
    username: String,
    password_hash: String,
    jwt_secret: String,
}

impl AuthServiceImpl {
    pub fn new(username: String, password_hash: String, jwt_secret: String) -> Self {
        Self {
            username,
            password_hash,
            jwt_secret,
        }
    }

    /// Generate a JWT token valid for 24 hours
    fn generate_jwt(&self) -> Result<AuthToken, AuthError> {
        let expiration = Utc::now() + Duration::hours(24);

        let claims = Claims {
            sub: self.username.clone(),
            exp: expiration.timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::Internal(format!("Token generation failed: {}", e)))?;

        Ok(AuthToken {
            token,
            expires_at: expiration,
        })
    }

    fn decode_jwt(&self, token: &str) -> Result<String, AuthError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?;

        // Tokens issued before the operator was renamed no longer apply
        if token_data.claims.sub != self.username {
            return Err(AuthError::InvalidToken);
        }
        Ok(token_data.claims.sub)
    }
}

#[async_trait]
impl AuthService for AuthServiceImpl {
    async fn login(&self, request: LoginRequest) -> Result<AuthToken, AuthError> {
        if request.username.trim() != self.username {
            tracing::warn!(username = %request.username, "Login rejected: unknown user");
            return Err(AuthError::InvalidCredentials);
        }

        let is_valid = verify(&request.password, &self.password_hash)
            .map_err(|e| AuthError::Internal(format!("Password verification failed: {}", e)))?;
        if !is_valid {
            tracing::warn!(username = %self.username, "Login rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        tracing::info!(username = %self.username, "Operator logged in");
        self.generate_jwt()
    }

    async fn validate_token(&self, token: &str) -> Result<String, AuthError> {
        self.decode_jwt(token)
    }
}
