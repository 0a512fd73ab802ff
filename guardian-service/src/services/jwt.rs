use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::services::ServiceError;

/// HS256 with no clock leeway: a token is dead the second `exp` passes.
pub(crate) fn strict_validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Claims shared by access and refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub is_officer: bool,
    pub token_type: TokenType,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid, ServiceError> {
        Uuid::parse_str(&self.sub).map_err(|_| ServiceError::InvalidToken)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TryFrom<Vec<String>> for TokenPair {
    type Error = ServiceError;

    /// Expects `[access, refresh]`; anything shorter is an issuance failure.
    fn try_from(tokens: Vec<String>) -> Result<Self, Self::Error> {
        let mut tokens = tokens.into_iter();
        match (tokens.next(), tokens.next()) {
            (Some(access_token), Some(refresh_token)) => Ok(Self {
                access_token,
                refresh_token,
            }),
            _ => Err(ServiceError::TokenIssuance),
        }
    }
}

/// HS256 access/refresh token issuer. Each token type has its own secret.
#[derive(Clone)]
pub struct JwtService {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_token_expiry_minutes: i64,
    refresh_token_expiry_days: i64,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Self {
        let access = config.access_secret.expose_secret().as_bytes();
        let refresh = config.refresh_secret.expose_secret().as_bytes();

        Self {
            access_encoding: EncodingKey::from_secret(access),
            access_decoding: DecodingKey::from_secret(access),
            refresh_encoding: EncodingKey::from_secret(refresh),
            refresh_decoding: DecodingKey::from_secret(refresh),
            access_token_expiry_minutes: config.access_token_expiry_minutes,
            refresh_token_expiry_days: config.refresh_token_expiry_days,
        }
    }

    fn sign(
        &self,
        user_id: Uuid,
        is_officer: bool,
        token_type: TokenType,
    ) -> Result<String, ServiceError> {
        let now = Utc::now();
        let (lifetime, key) = match token_type {
            TokenType::Access => (
                Duration::minutes(self.access_token_expiry_minutes),
                &self.access_encoding,
            ),
            TokenType::Refresh => (
                Duration::days(self.refresh_token_expiry_days),
                &self.refresh_encoding,
            ),
        };

        let claims = Claims {
            sub: user_id.to_string(),
            is_officer,
            token_type,
            exp: (now + lifetime).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, key)
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Failed to encode token: {}", e)))
    }

    pub fn generate_access_token(&self, user_id: Uuid, is_officer: bool) -> Result<String, ServiceError> {
        self.sign(user_id, is_officer, TokenType::Access)
    }

    pub fn generate_refresh_token(&self, user_id: Uuid, is_officer: bool) -> Result<String, ServiceError> {
        self.sign(user_id, is_officer, TokenType::Refresh)
    }

    /// `[access, refresh]`
    pub fn generate_tokens(&self, user_id: Uuid, is_officer: bool) -> Result<Vec<String>, ServiceError> {
        Ok(vec![
            self.generate_access_token(user_id, is_officer)?,
            self.generate_refresh_token(user_id, is_officer)?,
        ])
    }

    fn verify(&self, token: &str, expected: TokenType) -> Result<Claims, ServiceError> {
        let key = match expected {
            TokenType::Access => &self.access_decoding,
            TokenType::Refresh => &self.refresh_decoding,
        };

        let claims = decode::<Claims>(token, key, &strict_validation())
            .map_err(|e| {
                tracing::debug!(error = %e, token_type = ?expected, "Token verification failed");
                ServiceError::InvalidToken
            })?
            .claims;

        if claims.token_type != expected {
            return Err(ServiceError::InvalidToken);
        }

        Ok(claims)
    }

    pub fn validate_access_token(&self, token: &str) -> Result<Claims, ServiceError> {
        self.verify(token, TokenType::Access)
    }

    pub fn validate_refresh_token(&self, token: &str) -> Result<Claims, ServiceError> {
        self.verify(token, TokenType::Refresh)
    }

    pub fn access_token_expiry_seconds(&self) -> i64 {
        self.access_token_expiry_minutes * 60
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_config;

    fn service() -> JwtService {
        JwtService::new(&test_config().jwt)
    }

    #[test]
    fn generate_tokens_returns_access_then_refresh() {
        let jwt = service();
        let user_id = Uuid::new_v4();

        let tokens = jwt.generate_tokens(user_id, true).unwrap();
        assert_eq!(tokens.len(), 2);

        let access = jwt.validate_access_token(&tokens[0]).unwrap();
        assert_eq!(access.user_id().unwrap(), user_id);
        assert!(access.is_officer);

        let refresh = jwt.validate_refresh_token(&tokens[1]).unwrap();
        assert_eq!(refresh.token_type, TokenType::Refresh);
    }

    #[test]
    fn token_types_are_not_interchangeable() {
        let jwt = service();
        let tokens = jwt.generate_tokens(Uuid::new_v4(), false).unwrap();

        assert!(jwt.validate_refresh_token(&tokens[0]).is_err());
        assert!(jwt.validate_access_token(&tokens[1]).is_err());
    }

    #[test]
    fn rejects_expired_tokens() {
        let mut config = test_config().jwt;
        config.access_token_expiry_minutes = -5;
        let jwt = JwtService::new(&config);

        let token = jwt.generate_access_token(Uuid::new_v4(), false).unwrap();
        assert!(matches!(
            jwt.validate_access_token(&token),
            Err(ServiceError::InvalidToken)
        ));
    }

    #[test]
    fn tokens_expired_seconds_ago_are_rejected() {
        let config = test_config().jwt;
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            is_officer: false,
            token_type: TokenType::Access,
            exp: now - 5,
            iat: now - 65,
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(config.access_secret.expose_secret().as_bytes()),
        )
        .unwrap();

        assert!(matches!(
            JwtService::new(&config).validate_access_token(&token),
            Err(ServiceError::InvalidToken)
        ));
    }

    #[test]
    fn short_token_list_is_an_issuance_failure() {
        assert!(matches!(
            TokenPair::try_from(vec!["only-access".to_string()]),
            Err(ServiceError::TokenIssuance)
        ));
    }
}
