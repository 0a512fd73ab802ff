pub mod alerts;
pub mod auth;
pub mod files;
pub mod lost_articles;
pub mod metrics;
pub mod mfa;
pub mod personal_details;
pub mod reports;
pub mod users;
