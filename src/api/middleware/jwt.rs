//! JWT token service
//!
//! Issues and verifies the HS256 tokens clients present as the first
//! WebSocket frame.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::AuthConfig;
use crate::error::{FeedError, Result};

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user identifier)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    #[serde(default)]
    pub iat: i64,
}

impl Claims {
    /// Create new claims for a subject
    pub fn new(subject: &str, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: subject.to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }
}

/// Token issuer/verifier
#[derive(Clone)]
pub struct JwtAuth {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl JwtAuth {
    /// Create a token service from a secret and token lifetime
    ///
    /// If the secret is empty, generates a secure random secret, so tokens
    /// only verify within this process.
    pub fn new(secret: &str, ttl: Duration) -> Result<Self> {
        let key = if secret.is_empty() {
            let mut key_bytes = [0u8; 32];
            OsRng.try_fill_bytes(&mut key_bytes).map_err(|e| {
                FeedError::Internal(format!("Failed to generate JWT secret: {}", e))
            })?;

            debug!("Generated random JWT secret");
            key_bytes.to_vec()
        } else {
            secret.as_bytes().to_vec()
        };

        Ok(Self {
            encoding_key: EncodingKey::from_secret(&key),
            decoding_key: DecodingKey::from_secret(&key),
            ttl,
        })
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        Self::new(&config.jwt_secret, Duration::seconds(config.token_ttl_secs))
    }

    /// Issue a token for `subject` with the configured lifetime
    pub fn issue(&self, subject: &str) -> Result<String> {
        self.issue_with_ttl(subject, self.ttl)
    }

    /// Issue a token with an explicit lifetime (negative = already expired)
    pub fn issue_with_ttl(&self, subject: &str, ttl: Duration) -> Result<String> {
        let claims = Claims::new(subject, ttl);

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            error!("Failed to generate JWT: {}", e);
            FeedError::TokenCreation
        })
    }

    /// Verify a token and return its claims
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let token = Self::extract_token(token.trim()).unwrap_or(token.trim());

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("JWT validation failed: {}", e);
                match e.kind() {
                    ErrorKind::ExpiredSignature => FeedError::ExpiredCredential,
                    _ => FeedError::InvalidCredential,
                }
            })?;

        // The library still accepts exp == now; a token is only valid strictly before exp
        if claims.exp <= Utc::now().timestamp() {
            return Err(FeedError::ExpiredCredential);
        }

        Ok(claims)
    }

    /// Verify a token and return the embedded subject
    pub fn verify(&self, token: &str) -> Result<String> {
        self.validate_token(token).map(|claims| claims.sub)
    }

    /// Strip an optional `Bearer ` prefix
    pub fn extract_token(authorization: &str) -> Option<&str> {
        authorization.strip_prefix("Bearer ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn auth() -> JwtAuth {
        JwtAuth::new("test-secret", Duration::hours(1)).unwrap()
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let auth = auth();

        let token = assert_ok!(auth.issue("u1"));
        assert_eq!(auth.verify(&token).unwrap(), "u1");
    }

    #[test]
    fn test_issued_token_expires_after_one_hour() {
        let auth = auth();

        let token = auth.issue("u1").unwrap();
        let claims = auth.validate_token(&token).unwrap();
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_random_secret() {
        let auth = JwtAuth::new("", Duration::hours(1)).unwrap();
        let token = auth.issue("user123").unwrap();

        assert_eq!(auth.verify(&token).unwrap(), "user123");

        // A different random secret must not accept it
        let other = JwtAuth::new("", Duration::hours(1)).unwrap();
        assert!(matches!(other.verify(&token), Err(FeedError::InvalidCredential)));
    }

    #[test]
    fn test_expired_token() {
        let auth = auth();

        let token = auth.issue_with_ttl("user123", Duration::hours(-1)).unwrap();
        let result = auth.verify(&token);
        assert!(matches!(result, Err(FeedError::ExpiredCredential)));
    }

    #[test]
    fn test_token_expired_by_one_second() {
        let auth = auth();

        let token = auth.issue_with_ttl("user123", Duration::seconds(-1)).unwrap();
        assert!(matches!(auth.verify(&token), Err(FeedError::ExpiredCredential)));
    }

    #[test]
    fn test_token_expiring_now_is_rejected() {
        let auth = auth();

        let token = auth.issue_with_ttl("user123", Duration::zero()).unwrap();
        assert!(matches!(auth.verify(&token), Err(FeedError::ExpiredCredential)));
    }

    #[test]
    fn test_token_without_iat_is_accepted() {
        #[derive(Serialize)]
        struct SubjectOnly {
            sub: String,
            exp: i64,
        }

        let claims = SubjectOnly {
            sub: "u1".to_string(),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert_eq!(auth().verify(&token).unwrap(), "u1");
    }

    #[test]
    fn test_malformed_token() {
        let auth = auth();

        let result = auth.verify("invalid.token.here");
        assert!(matches!(result, Err(FeedError::InvalidCredential)));
        assert_err!(auth.verify(""));
    }

    #[test]
    fn test_wrong_secret() {
        let token = JwtAuth::new("other-secret", Duration::hours(1))
            .unwrap()
            .issue("user123")
            .unwrap();

        assert!(matches!(auth().verify(&token), Err(FeedError::InvalidCredential)));
    }

    #[test]
    fn test_tampered_signature() {
        let auth = auth();
        let token = auth.issue("user123").unwrap();

        let (head, sig) = token.rsplit_once('.').unwrap();
        let flipped = if sig.starts_with('A') { 'B' } else { 'A' };
        let tampered = format!("{}.{}{}", head, flipped, &sig[1..]);

        assert!(matches!(auth.verify(&tampered), Err(FeedError::InvalidCredential)));
    }

    #[test]
    fn test_tampered_payload() {
        let auth = auth();
        let token = auth.issue("user123").unwrap();
        let forged = auth.issue("admin").unwrap();

        // Splice the forged claims under the original signature
        let parts: Vec<&str> = token.split('.').collect();
        let forged_parts: Vec<&str> = forged.split('.').collect();
        let tampered = format!("{}.{}.{}", parts[0], forged_parts[1], parts[2]);

        assert!(matches!(auth.verify(&tampered), Err(FeedError::InvalidCredential)));
    }

    #[test]
    fn test_missing_subject_claim() {
        #[derive(Serialize)]
        struct NoSubject {
            exp: i64,
        }

        let claims = NoSubject {
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(matches!(auth().verify(&token), Err(FeedError::InvalidCredential)));
    }

    #[test]
    fn test_bearer_prefix_accepted() {
        let auth = auth();
        let token = auth.issue("u1").unwrap();

        assert_eq!(auth.verify(&format!("Bearer {}", token)).unwrap(), "u1");
    }

    #[test]
    fn test_extract_token() {
        assert_eq!(JwtAuth::extract_token("Bearer abc123"), Some("abc123"));
        assert_eq!(JwtAuth::extract_token("abc123"), None);
    }
}
