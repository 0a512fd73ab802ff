use std::sync::Arc;

use chrono::Utc;
use once_cell::sync::Lazy;
use secrecy::Secret;
use uuid::Uuid;

use crate::db::{Criteria, Repository, RepositoryError};
use crate::models::user::{normalize_email, User};
use crate::services::jwt::{JwtService, TokenPair};
use crate::services::{metrics, Actor, MfaService, ServiceError};
use crate::utils::{hash_password, verify_password};

/// Checked against when the email is unknown so a miss costs as much as a
/// wrong password.
static DUMMY_HASH: Lazy<Result<String, String>> = Lazy::new(|| {
    hash_password(&Secret::new("guardian-dummy-password".to_string())).map_err(|e| e.to_string())
});

fn dummy_hash() -> Result<&'static str, ServiceError> {
    DUMMY_HASH
        .as_deref()
        .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Dummy password hash unavailable: {}", e)))
}

#[derive(Debug)]
pub enum LoginOutcome {
    MfaRequired { mfa_token: String },
    Authenticated { user: User, tokens: TokenPair },
}

pub struct NewAccount {
    pub email: String,
    pub password: Secret<String>,
    pub full_name: String,
}

pub struct AuthService {
    users: Arc<dyn Repository<User>>,
    jwt: JwtService,
    mfa: Arc<MfaService>,
    /// Normalized addresses that register straight into the officer role.
    officer_emails: Vec<String>,
}

fn is_unique_violation(err: &RepositoryError) -> bool {
    match err {
        RepositoryError::Database(sqlx::Error::Database(db)) => db.is_unique_violation(),
        _ => false,
    }
}

impl AuthService {
    pub fn new(
        users: Arc<dyn Repository<User>>,
        jwt: JwtService,
        mfa: Arc<MfaService>,
        officer_emails: &[String],
    ) -> Self {
        Self {
            users,
            jwt,
            mfa,
            officer_emails: officer_emails.iter().map(|e| normalize_email(e)).collect(),
        }
    }

    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        Ok(self
            .users
            .find_one_by(&Criteria::new().eq("email", normalize_email(email)))
            .await?)
    }

    async fn find_user(&self, user_id: Uuid) -> Result<User, ServiceError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(ServiceError::UserNotFound)
    }

    /// Self-service sign-up always yields a citizen unless the address is
    /// on the configured officer list.
    #[tracing::instrument(skip_all)]
    pub async fn register(&self, account: NewAccount) -> Result<User, ServiceError> {
        if self.find_by_email(&account.email).await?.is_some() {
            return Err(ServiceError::EmailAlreadyRegistered);
        }

        let password_hash = hash_password(&account.password)?;
        let is_officer = self
            .officer_emails
            .contains(&normalize_email(&account.email));
        let user = User::new(&account.email, account.full_name, password_hash, is_officer);

        self.users.save(&user).await.map_err(|e| {
            if is_unique_violation(&e) {
                ServiceError::EmailAlreadyRegistered
            } else {
                e.into()
            }
        })?;

        tracing::info!(user_id = %user.id, is_officer = user.is_officer, "User registered");
        Ok(user)
    }

    /// Password check, then either an MFA challenge or, for accounts with
    /// MFA switched off, a token pair.
    #[tracing::instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &Secret<String>) -> Result<LoginOutcome, ServiceError> {
        let user = match self.find_by_email(email).await? {
            Some(user) => user,
            None => {
                let _ = verify_password(password, dummy_hash()?);
                metrics::record_login("unknown_user");
                return Err(ServiceError::InvalidCredentials);
            }
        };

        if !verify_password(password, &user.password_hash)? {
            tracing::warn!(user_id = %user.id, "Login failed: wrong password");
            metrics::record_login("bad_password");
            return Err(ServiceError::InvalidCredentials);
        }

        if user.mfa_enabled {
            let mfa_token = self
                .mfa
                .start_challenge(&user.id.to_string(), &user.email)
                .await?;
            metrics::record_login("mfa_required");
            return Ok(LoginOutcome::MfaRequired { mfa_token });
        }

        let tokens = self.generate_tokens(&user)?;
        metrics::record_login("authenticated");
        Ok(LoginOutcome::Authenticated { user, tokens })
    }

    /// Look up the subject of a verified MFA token.
    pub async fn mfa_verified(&self, sub: &str) -> Result<User, ServiceError> {
        let user_id = Uuid::parse_str(sub).map_err(|_| ServiceError::UserNotFound)?;
        self.find_user(user_id).await
    }

    pub fn generate_tokens(&self, user: &User) -> Result<TokenPair, ServiceError> {
        TokenPair::try_from(self.jwt.generate_tokens(user.id, user.is_officer)?)
    }

    /// Exchange a refresh token for a new pair. The officer flag is re-read
    /// from the user record, not trusted from the old token.
    #[tracing::instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ServiceError> {
        let claims = self.jwt.validate_refresh_token(refresh_token)?;
        let user = self
            .users
            .find_by_id(claims.user_id()?)
            .await?
            .ok_or(ServiceError::InvalidToken)?;

        tracing::debug!(user_id = %user.id, "Refreshing tokens");
        self.generate_tokens(&user)
    }

    /// Switch the email second factor on or off. The current password is
    /// required so a stolen access token cannot downgrade the account.
    #[tracing::instrument(skip_all, fields(user_id = %user_id))]
    pub async fn set_mfa_enabled(
        &self,
        user_id: Uuid,
        password: &Secret<String>,
        enabled: bool,
    ) -> Result<User, ServiceError> {
        let mut user = self.find_user(user_id).await?;
        if !verify_password(password, &user.password_hash)? {
            tracing::warn!("MFA change refused: wrong password");
            return Err(ServiceError::Forbidden("Password is incorrect".to_string()));
        }

        user.mfa_enabled = enabled;
        user.updated_at = Utc::now();
        self.users.save(&user).await?;

        tracing::info!(mfa_enabled = enabled, "MFA setting changed");
        Ok(user)
    }

    /// Grant or revoke the officer role. Takes effect at the target's next
    /// token refresh.
    #[tracing::instrument(skip_all, fields(actor = %actor.user_id, user_id = %user_id))]
    pub async fn set_officer(
        &self,
        actor: &Actor,
        user_id: Uuid,
        is_officer: bool,
    ) -> Result<User, ServiceError> {
        if !actor.is_officer {
            return Err(ServiceError::Forbidden(
                "Only officers can change roles".to_string(),
            ));
        }
        if actor.user_id == user_id {
            return Err(ServiceError::Forbidden(
                "Officers cannot change their own role".to_string(),
            ));
        }

        let mut user = self.find_user(user_id).await?;
        user.is_officer = is_officer;
        user.updated_at = Utc::now();
        self.users.save(&user).await?;

        tracing::info!(is_officer, "Role changed");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_config;
    use crate::db::MemoryRepository;
    use crate::services::{MemoryChallengeStore, MockEmailService};

    const OFFICER_EMAIL: &str = "desk.sergeant@example.com";

    fn setup() -> (AuthService, Arc<MockEmailService>) {
        let config = test_config();
        let email = Arc::new(MockEmailService::new());
        let mfa = Arc::new(MfaService::new(
            &config.mfa,
            Arc::new(MemoryChallengeStore::new()),
            email.clone(),
        ));
        let service = AuthService::new(
            Arc::new(MemoryRepository::<User>::new()),
            JwtService::new(&config.jwt),
            mfa,
            &[" Desk.Sergeant@Example.com ".to_string()],
        );
        (service, email)
    }

    fn account(email: &str) -> NewAccount {
        NewAccount {
            email: email.to_string(),
            password: Secret::new("s3cure-passw0rd".to_string()),
            full_name: "Casey Citizen".to_string(),
        }
    }

    #[tokio::test]
    async fn duplicate_emails_conflict_case_insensitively() {
        let (service, _) = setup();
        service.register(account("casey@example.com")).await.unwrap();

        assert!(matches!(
            service.register(account("CASEY@example.com")).await,
            Err(ServiceError::EmailAlreadyRegistered)
        ));
    }

    #[tokio::test]
    async fn login_issues_mfa_challenge() {
        let (service, email) = setup();
        service.register(account("casey@example.com")).await.unwrap();

        let outcome = service
            .login("casey@example.com", &Secret::new("s3cure-passw0rd".to_string()))
            .await
            .unwrap();

        assert!(matches!(outcome, LoginOutcome::MfaRequired { .. }));
        assert!(email.last_code_for("casey@example.com").is_some());
    }

    #[tokio::test]
    async fn bad_credentials_are_indistinguishable() {
        let (service, _) = setup();
        service.register(account("casey@example.com")).await.unwrap();

        let wrong_password = service
            .login("casey@example.com", &Secret::new("nope-nope".to_string()))
            .await
            .unwrap_err();
        let unknown_user = service
            .login("nobody@example.com", &Secret::new("nope-nope".to_string()))
            .await
            .unwrap_err();

        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    }

    #[tokio::test]
    async fn mfa_disabled_accounts_get_tokens_directly() {
        let (service, _) = setup();
        let user = service.register(account("casey@example.com")).await.unwrap();
        service
            .set_mfa_enabled(user.id, &Secret::new("s3cure-passw0rd".to_string()), false)
            .await
            .unwrap();

        let outcome = service
            .login("casey@example.com", &Secret::new("s3cure-passw0rd".to_string()))
            .await
            .unwrap();

        match outcome {
            LoginOutcome::Authenticated { tokens, .. } => {
                let refreshed = service.refresh(&tokens.refresh_token).await.unwrap();
                let claims = service.jwt().validate_access_token(&refreshed.access_token).unwrap();
                assert_eq!(claims.user_id().unwrap(), user.id);
            }
            other => panic!("expected tokens, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn mfa_verified_unknown_subject_is_not_found() {
        let (service, _) = setup();
        assert!(matches!(
            service.mfa_verified(&Uuid::new_v4().to_string()).await,
            Err(ServiceError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn mfa_cannot_be_switched_off_without_the_password() {
        let (service, _) = setup();
        let user = service.register(account("casey@example.com")).await.unwrap();

        assert!(matches!(
            service
                .set_mfa_enabled(user.id, &Secret::new("guessed-wrong".to_string()), false)
                .await,
            Err(ServiceError::Forbidden(_))
        ));

        let outcome = service
            .login("casey@example.com", &Secret::new("s3cure-passw0rd".to_string()))
            .await
            .unwrap();
        assert!(matches!(outcome, LoginOutcome::MfaRequired { .. }));
    }

    #[tokio::test]
    async fn registration_creates_citizens_unless_listed() {
        let (service, _) = setup();

        let citizen = service.register(account("casey@example.com")).await.unwrap();
        assert!(!citizen.is_officer);

        let officer = service.register(account(OFFICER_EMAIL)).await.unwrap();
        assert!(officer.is_officer);
    }

    #[tokio::test]
    async fn only_officers_change_roles() {
        let (service, _) = setup();
        let officer = service.register(account(OFFICER_EMAIL)).await.unwrap();
        let citizen = service.register(account("casey@example.com")).await.unwrap();
        let other = service.register(account("robin@example.com")).await.unwrap();

        let as_citizen = Actor {
            user_id: citizen.id,
            is_officer: false,
        };
        assert!(matches!(
            service.set_officer(&as_citizen, citizen.id, true).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            service.set_officer(&as_citizen, other.id, true).await,
            Err(ServiceError::Forbidden(_))
        ));

        let as_officer = Actor {
            user_id: officer.id,
            is_officer: true,
        };
        let promoted = service.set_officer(&as_officer, other.id, true).await.unwrap();
        assert!(promoted.is_officer);

        let tokens = service.generate_tokens(&promoted).unwrap();
        let refreshed = service.refresh(&tokens.refresh_token).await.unwrap();
        let claims = service.jwt().validate_access_token(&refreshed.access_token).unwrap();
        assert!(claims.is_officer);

        assert!(matches!(
            service.set_officer(&as_officer, officer.id, false).await,
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[test]
    fn unknown_user_logins_verify_against_a_real_hash() {
        let hash = dummy_hash().unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(!verify_password(&Secret::new("anything".to_string()), hash).unwrap());
    }
}
