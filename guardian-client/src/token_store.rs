use std::sync::RwLock;

use crate::client::TokenPair;

/// Where the client keeps its session tokens.
pub trait TokenStore: Send + Sync {
    fn access_token(&self) -> Option<String>;
    fn refresh_token(&self) -> Option<String>;
    fn store(&self, tokens: TokenPair);
    fn clear(&self);
}

/// Process-local token cache.
#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<Option<TokenPair>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(tokens: TokenPair) -> Self {
        Self {
            tokens: RwLock::new(Some(tokens)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn access_token(&self) -> Option<String> {
        self.tokens
            .read()
            .ok()
            .and_then(|t| t.as_ref().map(|t| t.access_token.clone()))
    }

    fn refresh_token(&self) -> Option<String> {
        self.tokens
            .read()
            .ok()
            .and_then(|t| t.as_ref().map(|t| t.refresh_token.clone()))
    }

    fn store(&self, tokens: TokenPair) {
        if let Ok(mut guard) = self.tokens.write() {
            *guard = Some(tokens);
        }
    }

    fn clear(&self) {
        if let Ok(mut guard) = self.tokens.write() {
            *guard = None;
        }
    }
}
