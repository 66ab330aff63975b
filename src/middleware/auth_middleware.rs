use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::handlers::error_response::ErrorResponse;
use crate::services::auth_service::{AuthError as ServiceAuthError, AuthService};

/// Extension type carrying the signed-in operator
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub username: String,
}

/// Validates the bearer token and adds the operator to request extensions
pub async fn auth_middleware(
    State(auth_service): State<Arc<dyn AuthService>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_header = headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthError::MissingToken)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidTokenFormat)?;

    let username = auth_service
        .validate_token(token)
        .await
        .map_err(|e| match e {
            ServiceAuthError::TokenExpired => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?;

    request
        .extensions_mut()
        .insert(AuthenticatedUser { username });

    Ok(next.run(request).await)
}

/// Auth middleware errors
#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidTokenFormat,
    InvalidToken,
    TokenExpired,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (error_type, message) = match self {
            AuthError::MissingToken => ("missing_token", "Missing authorization token"),
            AuthError::InvalidTokenFormat => (
                "invalid_token_format",
                "Invalid authorization header format. Expected: Bearer <token>",
            ),
            AuthError::InvalidToken => ("invalid_token", "Invalid or malformed token"),
            AuthError::TokenExpired => ("token_expired", "Token has expired"),
        };

        ErrorResponse::new(error_type, message).into_response_with(StatusCode::UNAUTHORIZED)
    }
}
