pub mod cookies;
pub mod google_credentials;
pub mod password;
pub mod pii;
pub mod validation;

pub use password::{hash_password, verify_password};
pub use pii::{scrub_pii, scrub_value};
pub use validation::ValidatedJson;
