//! Session boundary: something that can hand out a marketplace bearer token.
//!
//! In production the token comes from a signed-in browser profile; this crate
//! only depends on the two operations below.

use crate::error::{Result, SyncError};
use async_trait::async_trait;

#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Current access token, as sent in the `authorization` header.
    async fn bearer_token(&self) -> Result<String>;

    /// Ask the session to renew its token (reload the page, re-login, ...).
    async fn refresh(&self) -> Result<()>;
}

/// Token supplied once through configuration.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(SyncError::Config("marketplace token is empty".to_string()));
        }
        Ok(Self {
            token: token.trim().to_string(),
        })
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn bearer_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }

    async fn refresh(&self) -> Result<()> {
        Ok(())
    }
}
