//! Email-delivered one-time codes bound to a short-lived MFA token.
//!
//! Login hands the client an MFA token (signed with `JWT_MFA_SECRET`) and
//! emails a numeric code. The pending code lives in the challenge store
//! under the token's subject until it is used, replaced by a resend, burnt
//! by too many wrong guesses, or expires with the token.

use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header};
use rand::Rng;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::config::MfaConfig;
use crate::services::jwt::strict_validation;
use crate::services::{ChallengeStore, EmailProvider, MfaChallenge, ServiceError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MfaClaims {
    /// User id
    pub sub: String,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Clone)]
pub struct MfaTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_seconds: i64,
}

impl MfaTokenService {
    pub fn new(config: &MfaConfig) -> Self {
        let secret = config.secret.expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            expiry_seconds: config.token_expiry_seconds,
        }
    }

    pub fn expiry_seconds(&self) -> i64 {
        self.expiry_seconds
    }

    /// Unix timestamp a token issued now would expire at.
    pub fn fresh_expiry(&self) -> i64 {
        Utc::now().timestamp() + self.expiry_seconds
    }

    pub fn generate_token(&self, sub: &str, email: &str, exp: i64) -> Result<String, ServiceError> {
        let claims = MfaClaims {
            sub: sub.to_string(),
            email: email.to_string(),
            exp,
            iat: Utc::now().timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Failed to encode MFA token: {}", e)))
    }

    /// Signature and expiry check.
    pub fn verify_token(&self, token: &str) -> Result<MfaClaims, ServiceError> {
        decode::<MfaClaims>(token, &self.decoding_key, &strict_validation())
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "MFA token rejected");
                ServiceError::InvalidToken
            })
    }
}

pub fn hash_code(code: &str) -> String {
    hex::encode(Sha256::digest(code.as_bytes()))
}

pub fn generate_code(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

pub struct MfaService {
    tokens: MfaTokenService,
    challenges: Arc<dyn ChallengeStore>,
    email: Arc<dyn EmailProvider>,
    code_length: usize,
    max_attempts: u32,
}

impl MfaService {
    pub fn new(
        config: &MfaConfig,
        challenges: Arc<dyn ChallengeStore>,
        email: Arc<dyn EmailProvider>,
    ) -> Self {
        Self {
            tokens: MfaTokenService::new(config),
            challenges,
            email,
            code_length: config.code_length,
            max_attempts: config.max_attempts,
        }
    }

    pub fn tokens(&self) -> &MfaTokenService {
        &self.tokens
    }

    async fn issue_code(&self, sub: &str, email: &str) -> Result<(), ServiceError> {
        let code = generate_code(self.code_length);
        let challenge = MfaChallenge {
            code_hash: hash_code(&code),
            attempts: 0,
        };

        self.challenges
            .put(sub, &challenge, self.tokens.expiry_seconds())
            .await?;
        self.email.send_mfa_code(email, &code).await
    }

    /// Store and email a new code; returns the MFA token the client must
    /// present alongside it.
    #[tracing::instrument(skip(self, email))]
    pub async fn start_challenge(&self, sub: &str, email: &str) -> Result<String, ServiceError> {
        let token = self
            .tokens
            .generate_token(sub, email, self.tokens.fresh_expiry())?;
        self.issue_code(sub, email).await?;

        tracing::info!("MFA challenge issued");
        Ok(token)
    }

    /// Returns the token's claims when `code` matches the pending challenge.
    #[tracing::instrument(skip_all)]
    pub async fn verify_code(&self, mfa_token: &str, code: &str) -> Result<MfaClaims, ServiceError> {
        let claims = self.tokens.verify_token(mfa_token)?;

        // The attempt is counted before the comparison so concurrent guesses
        // cannot share one slot.
        let challenge = self
            .challenges
            .begin_attempt(&claims.sub)
            .await?
            .ok_or(ServiceError::ChallengeNotFound)?;

        if challenge.attempts > self.max_attempts {
            self.challenges.take(&claims.sub).await?;
            return Err(ServiceError::TooManyAttempts);
        }

        let submitted = hash_code(code.trim());
        let matches: bool = submitted
            .as_bytes()
            .ct_eq(challenge.code_hash.as_bytes())
            .into();

        if matches {
            if !self.challenges.take(&claims.sub).await? {
                return Err(ServiceError::ChallengeNotFound);
            }
            tracing::info!(user_id = %claims.sub, "MFA code verified");
            return Ok(claims);
        }

        if challenge.attempts >= self.max_attempts {
            self.challenges.take(&claims.sub).await?;
            tracing::warn!(user_id = %claims.sub, "MFA challenge discarded after too many attempts");
            return Err(ServiceError::TooManyAttempts);
        }

        tracing::warn!(
            user_id = %claims.sub,
            attempts = challenge.attempts,
            "Invalid MFA code"
        );
        Err(ServiceError::InvalidCode)
    }

    /// Verify the current token, then re-issue both token and code.
    #[tracing::instrument(skip_all)]
    pub async fn resend_code(&self, mfa_token: &str) -> Result<String, ServiceError> {
        let claims = self.tokens.verify_token(mfa_token)?;

        let token = self.tokens.generate_token(
            &claims.sub,
            &claims.email,
            self.tokens.fresh_expiry(),
        )?;
        self.issue_code(&claims.sub, &claims.email).await?;

        tracing::info!(user_id = %claims.sub, "MFA code re-sent");
        Ok(token)
    }
}
