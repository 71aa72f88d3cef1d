//! Credential persistence abstraction.
//!
//! Verify tickets and component access tokens live in a keyed TTL store. The
//! in-process [`MemoryCredentialStore`] suits a single instance; several
//! instances behind a load balancer should share a [`SqliteCredentialStore`]
//! so a ticket pushed to one of them is visible to all.

mod memory;
mod sqlite;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

pub use memory::MemoryCredentialStore;
pub use sqlite::SqliteCredentialStore;

/// Keyed string store with absolute-time expiry.
///
/// Expired entries behave exactly like absent ones.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert or replace `key`, expiring `ttl` from now.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Fetch `key` if present and not expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Drop `key`. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Builds the cache keys for one namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKeys {
    namespace: String,
}

impl CacheKeys {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// `<namespace>:verify_ticket:<app_id>`
    pub fn verify_ticket(&self, app_id: &str) -> String {
        format!("{}:verify_ticket:{}", self.namespace, app_id)
    }

    /// `<namespace>:access_token:<app_id>`
    pub fn access_token(&self, app_id: &str) -> String {
        format!("{}:access_token:{}", self.namespace, app_id)
    }
}
