//! guardian-client: a typed client for the Guardian API.
//!
//! The client owns its token cache through an injected [`TokenStore`]. A
//! request that comes back `401` triggers one refresh and one replay; a
//! failed refresh clears the cache and surfaces the original error.

mod client;
mod error;
mod token_store;

pub use client::{GuardianClient, LoginOutcome, TokenPair};
pub use error::ClientError;
pub use token_store::{MemoryTokenStore, TokenStore};
