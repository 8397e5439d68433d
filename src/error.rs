use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Unified error type for the feed server
#[derive(Error, Debug)]
pub enum FeedError {
    // Credential errors
    #[error("Token has expired")]
    ExpiredCredential,

    #[error("Invalid token")]
    InvalidCredential,

    #[error("Failed to create token")]
    TokenCreation,

    #[error("Timed out waiting for token")]
    TokenTimeout,

    // Transport errors
    #[error("Client disconnected")]
    TransportDisconnect,

    #[error("Send failed: {0}")]
    SendFailure(String),

    #[error("Send timed out")]
    SendTimeout,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Fault injection
    #[error("Simulated server crash error")]
    SimulatedCrash,

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for feed operations
pub type Result<T> = std::result::Result<T, FeedError>;

impl FeedError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            FeedError::InvalidConfig(_) => StatusCode::BAD_REQUEST,

            // 401 Unauthorized
            FeedError::ExpiredCredential | FeedError::InvalidCredential => {
                StatusCode::UNAUTHORIZED
            }

            // 408 Request Timeout
            FeedError::TokenTimeout => StatusCode::REQUEST_TIMEOUT,

            // 502 Bad Gateway
            FeedError::TransportDisconnect | FeedError::SendFailure(_) => StatusCode::BAD_GATEWAY,

            // 504 Gateway Timeout
            FeedError::SendTimeout => StatusCode::GATEWAY_TIMEOUT,

            // 500 Internal Server Error
            FeedError::TokenCreation
            | FeedError::Serialization(_)
            | FeedError::Io(_)
            | FeedError::SimulatedCrash
            | FeedError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Check if this is a credential rejection (expired or invalid token)
    pub fn is_credential_error(&self) -> bool {
        matches!(
            self,
            FeedError::ExpiredCredential | FeedError::InvalidCredential
        )
    }
}

impl IntoResponse for FeedError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({
            "detail": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_code_mapping() {
        assert_eq!(
            FeedError::ExpiredCredential.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            FeedError::InvalidCredential.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            FeedError::InvalidConfig("bad".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            FeedError::SendTimeout.status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            FeedError::SimulatedCrash.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_messages_are_client_facing() {
        assert_eq!(FeedError::ExpiredCredential.to_string(), "Token has expired");
        assert_eq!(FeedError::InvalidCredential.to_string(), "Invalid token");
        assert_eq!(
            FeedError::SimulatedCrash.to_string(),
            "Simulated server crash error"
        );
    }

    #[test]
    fn test_credential_errors() {
        assert!(FeedError::InvalidCredential.is_credential_error());
        assert!(FeedError::ExpiredCredential.is_credential_error());
        assert!(!FeedError::TokenTimeout.is_credential_error());
        assert!(!FeedError::TransportDisconnect.is_credential_error());
    }
}
