use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::config::JwtConfig;
use crate::services::error::MarketplaceError;
use crate::services::store::UserDirectory;

/// Issues and verifies HS256 bearer tokens carrying the caller's email.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

/// Claims embedded in every access token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdentityClaim {
    pub email: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl TokenService {
    pub fn new(config: &JwtConfig) -> Self {
        let secret = config.secret.expose_secret().as_bytes();
        tracing::info!(
            expiry_minutes = config.expiry_minutes,
            "Token service initialized with HS256 key"
        );
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl: Duration::minutes(config.expiry_minutes),
        }
    }

    #[cfg(test)]
    fn with_ttl(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Sign a token for `email`. Callers decide whether the email is entitled to one.
    pub fn issue(&self, email: &str) -> Result<String, MarketplaceError> {
        let now = Utc::now();
        let claims = IdentityClaim {
            email: email.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| MarketplaceError::Internal(anyhow::anyhow!("Failed to encode token: {}", e)))
    }

    /// Check signature and expiry and return the embedded claim.
    pub fn verify(&self, token: &str) -> Result<IdentityClaim, MarketplaceError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        decode::<IdentityClaim>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Token rejected");
                MarketplaceError::InvalidToken
            })
    }

    /// Issue a token only when a user with `email` exists. `None` means refuse quietly.
    pub async fn issue_for_registered(
        &self,
        users: &dyn UserDirectory,
        email: &str,
    ) -> Result<Option<String>, MarketplaceError> {
        if email.trim().is_empty() {
            tracing::info!("Token refused for blank email");
            return Ok(None);
        }

        match users.find_by_email(email).await? {
            Some(_) => self.issue(email).map(Some),
            None => {
                tracing::info!(email = %email, "Token refused for unregistered email");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, User, VerificationStatus};
    use crate::services::memory::InMemoryStore;

    #[test]
    fn verify_returns_the_issued_claim() {
        let tokens = TokenService::with_ttl("secret", Duration::minutes(60));
        let token = tokens.issue("a@x.com").unwrap();

        let claim = tokens.verify(&token).unwrap();
        assert_eq!(claim.email, "a@x.com");
        assert_eq!(claim.exp - claim.iat, 3600);
    }

    #[test]
    fn expired_token_is_invalid() {
        let tokens = TokenService::with_ttl("secret", Duration::minutes(-5));
        let token = tokens.issue("a@x.com").unwrap();

        assert!(matches!(
            tokens.verify(&token),
            Err(MarketplaceError::InvalidToken)
        ));
    }

    #[test]
    fn token_signed_with_another_key_is_invalid() {
        let ours = TokenService::with_ttl("secret", Duration::minutes(60));
        let theirs = TokenService::with_ttl("other-secret", Duration::minutes(60));
        let token = theirs.issue("a@x.com").unwrap();

        assert!(matches!(ours.verify(&token), Err(MarketplaceError::InvalidToken)));
    }

    #[test]
    fn garbage_is_invalid() {
        let tokens = TokenService::with_ttl("secret", Duration::minutes(60));
        assert!(tokens.verify("not.a.token").is_err());
        assert!(tokens.verify("").is_err());
    }

    #[tokio::test]
    async fn unregistered_email_gets_no_token() {
        let tokens = TokenService::with_ttl("secret", Duration::minutes(60));
        let store = InMemoryStore::new();
        store.seed_user(User {
            id: "u1".into(),
            email: "a@x.com".into(),
            name: None,
            role: Role::Buyer,
            verification_status: VerificationStatus::Unverified,
        });

        let granted = tokens.issue_for_registered(&store, "a@x.com").await.unwrap();
        assert!(granted.is_some());

        let refused = tokens.issue_for_registered(&store, "nobody@x.com").await.unwrap();
        assert_eq!(refused, None);
    }

    #[tokio::test]
    async fn blank_email_gets_no_token_even_when_an_emailless_user_exists() {
        let tokens = TokenService::with_ttl("secret", Duration::minutes(60));
        let store = InMemoryStore::new();
        store.seed_user(User {
            id: "ghost".into(),
            email: String::new(),
            name: None,
            role: Role::Admin,
            verification_status: VerificationStatus::Unverified,
        });

        assert_eq!(tokens.issue_for_registered(&store, "").await.unwrap(), None);
        assert_eq!(tokens.issue_for_registered(&store, "  ").await.unwrap(), None);
    }
}
