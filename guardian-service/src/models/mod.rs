//! Guardian domain entities, one table each.

pub mod alert;
pub mod lost_article;
pub mod personal_details;
pub mod report;
pub mod user;

pub use alert::{Alert, AlertSeverity};
pub use lost_article::{LostArticle, LostArticleStatus};
pub use personal_details::PersonalDetails;
pub use report::{Report, ReportStatus};
pub use user::User;
