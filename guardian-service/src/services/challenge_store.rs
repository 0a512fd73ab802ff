//! Pending MFA codes, keyed by user id.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use redis::{aio::ConnectionManager, AsyncCommands, Client, Script};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::config::RedisConfig;
use crate::services::ServiceError;

/// The code itself is never stored, only its SHA-256 hex digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MfaChallenge {
    pub code_hash: String,
    pub attempts: u32,
}

#[async_trait]
pub trait ChallengeStore: Send + Sync {
    /// Insert or replace the challenge for `subject`, resetting its attempts.
    async fn put(
        &self,
        subject: &str,
        challenge: &MfaChallenge,
        ttl_seconds: i64,
    ) -> Result<(), ServiceError>;

    async fn get(&self, subject: &str) -> Result<Option<MfaChallenge>, ServiceError>;

    /// Atomically count one more attempt and return the challenge with the
    /// new count. The expiry is left alone; a missing challenge stays gone.
    async fn begin_attempt(&self, subject: &str) -> Result<Option<MfaChallenge>, ServiceError>;

    /// Remove the challenge, returning whether this call removed it. Of
    /// several concurrent callers exactly one sees `true`.
    async fn take(&self, subject: &str) -> Result<bool, ServiceError>;

    async fn health_check(&self) -> Result<(), ServiceError>;
}

fn challenge_key(subject: &str) -> String {
    format!("mfa:challenge:{}", subject)
}

const CODE_HASH_FIELD: &str = "code_hash";
const ATTEMPTS_FIELD: &str = "attempts";

/// HINCRBY on a missing key would create it without a TTL.
static BEGIN_ATTEMPT_SCRIPT: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r"
        if redis.call('EXISTS', KEYS[1]) == 0 then
            return nil
        end
        local attempts = redis.call('HINCRBY', KEYS[1], ARGV[2], 1)
        local code_hash = redis.call('HGET', KEYS[1], ARGV[1])
        return {code_hash, attempts}
        ",
    )
});

#[derive(Clone)]
pub struct RedisChallengeStore {
    manager: ConnectionManager,
}

impl RedisChallengeStore {
    pub async fn new(config: &RedisConfig) -> Result<Self, anyhow::Error> {
        tracing::info!("Connecting to Redis");
        let client = Client::open(config.url.expose_secret().as_str())?;

        let manager = client.get_connection_manager().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to get Redis connection manager");
            anyhow::anyhow!("Failed to connect to Redis: {}", e)
        })?;

        tracing::info!("Successfully connected to Redis");
        Ok(Self { manager })
    }
}

#[async_trait]
impl ChallengeStore for RedisChallengeStore {
    async fn put(
        &self,
        subject: &str,
        challenge: &MfaChallenge,
        ttl_seconds: i64,
    ) -> Result<(), ServiceError> {
        let key = challenge_key(subject);
        let mut conn = self.manager.clone();
        redis::pipe()
            .atomic()
            .del(&key)
            .ignore()
            .hset_multiple(
                &key,
                &[
                    (CODE_HASH_FIELD, challenge.code_hash.clone()),
                    (ATTEMPTS_FIELD, challenge.attempts.to_string()),
                ],
            )
            .ignore()
            .expire(&key, ttl_seconds.max(1))
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn get(&self, subject: &str) -> Result<Option<MfaChallenge>, ServiceError> {
        let mut conn = self.manager.clone();
        let fields: HashMap<String, String> = conn.hgetall(challenge_key(subject)).await?;

        let code_hash = match fields.get(CODE_HASH_FIELD) {
            Some(hash) => hash.clone(),
            None => return Ok(None),
        };
        let attempts = fields
            .get(ATTEMPTS_FIELD)
            .and_then(|a| a.parse().ok())
            .unwrap_or(0);
        Ok(Some(MfaChallenge {
            code_hash,
            attempts,
        }))
    }

    async fn begin_attempt(&self, subject: &str) -> Result<Option<MfaChallenge>, ServiceError> {
        let mut conn = self.manager.clone();
        let result: Option<(String, u32)> = BEGIN_ATTEMPT_SCRIPT
            .key(challenge_key(subject))
            .arg(CODE_HASH_FIELD)
            .arg(ATTEMPTS_FIELD)
            .invoke_async(&mut conn)
            .await?;

        Ok(result.map(|(code_hash, attempts)| MfaChallenge {
            code_hash,
            attempts,
        }))
    }

    async fn take(&self, subject: &str) -> Result<bool, ServiceError> {
        let mut conn = self.manager.clone();
        let removed: i64 = conn.del(challenge_key(subject)).await?;
        Ok(removed > 0)
    }

    async fn health_check(&self) -> Result<(), ServiceError> {
        let mut conn = self.manager.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await?;
        Ok(())
    }
}

type Entries = HashMap<String, (MfaChallenge, Instant)>;

/// Process-local store for tests and single-node development.
#[derive(Default)]
pub struct MemoryChallengeStore {
    entries: Mutex<Entries>,
}

impl MemoryChallengeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock is held for the whole of each operation, which makes every
    /// trait method atomic.
    fn lock(&self) -> Result<MutexGuard<'_, Entries>, ServiceError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Challenge store poisoned: {}", e)))?;
        let now = Instant::now();
        entries.retain(|_, (_, expires)| *expires > now);
        Ok(entries)
    }
}

#[async_trait]
impl ChallengeStore for MemoryChallengeStore {
    async fn put(
        &self,
        subject: &str,
        challenge: &MfaChallenge,
        ttl_seconds: i64,
    ) -> Result<(), ServiceError> {
        let expires = Instant::now() + Duration::from_secs(ttl_seconds.max(1) as u64);
        self.lock()?
            .insert(challenge_key(subject), (challenge.clone(), expires));
        Ok(())
    }

    async fn get(&self, subject: &str) -> Result<Option<MfaChallenge>, ServiceError> {
        Ok(self
            .lock()?
            .get(&challenge_key(subject))
            .map(|(challenge, _)| challenge.clone()))
    }

    async fn begin_attempt(&self, subject: &str) -> Result<Option<MfaChallenge>, ServiceError> {
        Ok(self
            .lock()?
            .get_mut(&challenge_key(subject))
            .map(|(challenge, _)| {
                challenge.attempts += 1;
                challenge.clone()
            }))
    }

    async fn take(&self, subject: &str) -> Result<bool, ServiceError> {
        Ok(self.lock()?.remove(&challenge_key(subject)).is_some())
    }

    async fn health_check(&self) -> Result<(), ServiceError> {
        self.lock().map(|_| ())
    }
}
