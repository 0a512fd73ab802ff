//! Short-lived capability tokens for reading a stored file.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::config::FilesConfig;
use crate::services::jwt::strict_validation;
use crate::services::ServiceError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileTokenClaims {
    /// Stored file path, relative to the upload root
    pub sub: String,
    /// Identity the token was minted for
    pub actor: String,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileGrant {
    pub file_path: String,
    pub actor_id: String,
}

#[derive(Clone)]
pub struct FileTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    default_ttl_seconds: i64,
}

impl FileTokenService {
    pub fn new(config: &FilesConfig) -> Self {
        let secret = config.secret.expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            default_ttl_seconds: config.token_ttl_seconds,
        }
    }

    pub fn default_ttl_seconds(&self) -> i64 {
        self.default_ttl_seconds
    }

    pub fn generate_file_token(
        &self,
        file_path: &str,
        actor_id: &str,
        ttl_seconds: i64,
    ) -> Result<String, ServiceError> {
        self.generate_file_token_at(file_path, actor_id, ttl_seconds, Utc::now().timestamp())
    }

    /// `now` is whole Unix seconds; the token expires at `now + ttl_seconds`.
    pub fn generate_file_token_at(
        &self,
        file_path: &str,
        actor_id: &str,
        ttl_seconds: i64,
        now: i64,
    ) -> Result<String, ServiceError> {
        let claims = FileTokenClaims {
            sub: file_path.to_string(),
            actor: actor_id.to_string(),
            exp: now + ttl_seconds,
            iat: now,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Failed to encode file token: {}", e)))
    }

    pub fn decode_claims(&self, token: &str) -> Result<FileTokenClaims, ServiceError> {
        decode::<FileTokenClaims>(token, &self.decoding_key, &strict_validation())
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "File token rejected");
                ServiceError::InvalidToken
            })
    }

    pub fn get_file_name_from_token(&self, token: &str) -> Result<FileGrant, ServiceError> {
        let claims = self.decode_claims(token)?;
        Ok(FileGrant {
            file_path: claims.sub,
            actor_id: claims.actor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_config;

    fn service() -> FileTokenService {
        FileTokenService::new(&test_config().files)
    }

    #[test]
    fn token_carries_path_and_actor() {
        let tokens = service();
        let token = tokens
            .generate_file_token("user-1/evidence.jpg", "user-1", 120)
            .unwrap();

        assert_eq!(
            tokens.get_file_name_from_token(&token).unwrap(),
            FileGrant {
                file_path: "user-1/evidence.jpg".to_string(),
                actor_id: "user-1".to_string(),
            }
        );
    }

    #[test]
    fn expiry_is_issue_second_plus_ttl() {
        let tokens = service();
        let now = Utc::now().timestamp();
        let token = tokens
            .generate_file_token_at("a/b.png", "officer-7", 300, now)
            .unwrap();

        let claims = tokens.decode_claims(&token).unwrap();
        assert_eq!(claims.exp, now + 300);
        assert_eq!(claims.iat, now);
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let tokens = service();
        let token = tokens
            .generate_file_token_at("a/b.png", "u", 60, Utc::now().timestamp() - 3600)
            .unwrap();
        assert!(matches!(
            tokens.get_file_name_from_token(&token),
            Err(ServiceError::InvalidToken)
        ));
    }

    #[test]
    fn tokens_are_dead_as_soon_as_they_expire() {
        let tokens = service();
        let token = tokens
            .generate_file_token_at("a/b.png", "u", 10, Utc::now().timestamp() - 15)
            .unwrap();
        assert!(tokens.get_file_name_from_token(&token).is_err());
    }

    #[test]
    fn tokens_from_other_secrets_are_rejected() {
        let mut config = test_config().files;
        config.secret = secrecy::Secret::new("someone-else".to_string());
        let foreign = FileTokenService::new(&config)
            .generate_file_token("a/b.png", "u", 60)
            .unwrap();

        assert!(service().get_file_name_from_token(&foreign).is_err());
    }
}
