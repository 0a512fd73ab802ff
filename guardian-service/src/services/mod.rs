//! Business logic for the Guardian backend. Handlers stay thin and call in
//! here; everything returns `ServiceError`.

pub mod alerts;
pub mod authentication;
mod challenge_store;
mod email;
pub mod error;
pub mod file_token;
pub mod jwt;
pub mod lost_articles;
pub mod metrics;
pub mod mfa;
pub mod personal_details;
pub mod reports;
pub mod storage;

use uuid::Uuid;

pub use alerts::AlertService;
pub use authentication::{AuthService, LoginOutcome, NewAccount};
pub use challenge_store::{ChallengeStore, MemoryChallengeStore, MfaChallenge, RedisChallengeStore};
pub use email::{EmailProvider, MockEmailService, SmtpEmailService};
pub use error::ServiceError;
pub use file_token::{FileGrant, FileTokenService};
pub use jwt::{Claims, JwtService, TokenPair};
pub use lost_articles::LostArticleService;
pub use mfa::{MfaClaims, MfaService, MfaTokenService};
pub use personal_details::PersonalDetailsService;
pub use reports::ReportService;
pub use storage::{LocalStorage, Storage};

/// The authenticated caller, as established by the access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub is_officer: bool,
}
