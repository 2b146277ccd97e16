//! In-memory credentials store for testing and embedding
//!
//! The production credentials collaborator (encrypted, tenant-scoped)
//! lives outside this core; this implementation backs tests and
//! single-process deployments.

use async_trait::async_trait;
use crosspost_domain::model::{Platform, PlatformCredentials};
use crosspost_domain::ports::{CredentialsError, CredentialsStore};
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory credentials store implementation
pub struct InMemoryCredentialsStore {
    entries: RwLock<HashMap<(String, Platform), PlatformCredentials>>,
}

impl InMemoryCredentialsStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryCredentialsStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialsStore for InMemoryCredentialsStore {
    async fn get(
        &self,
        tenant_id: &str,
        platform: Platform,
    ) -> Result<Option<PlatformCredentials>, CredentialsError> {
        let entries = self
            .entries
            .read()
            .map_err(|e| CredentialsError::Store(e.to_string()))?;
        Ok(entries.get(&(tenant_id.to_string(), platform)).cloned())
    }

    async fn put(
        &self,
        tenant_id: &str,
        platform: Platform,
        credentials: PlatformCredentials,
    ) -> Result<(), CredentialsError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| CredentialsError::Store(e.to_string()))?;
        entries.insert((tenant_id.to_string(), platform), credentials);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trip_per_tenant_and_platform() {
        let store = InMemoryCredentialsStore::new();

        store
            .put("t1", Platform::Instagram, PlatformCredentials::new("tok-a"))
            .await
            .unwrap();

        let found = store.get("t1", Platform::Instagram).await.unwrap();
        assert_eq!(found.unwrap().access_token, "tok-a");

        assert!(store.get("t1", Platform::Facebook).await.unwrap().is_none());
        assert!(store.get("t2", Platform::Instagram).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_replaces_existing_credentials() {
        let store = InMemoryCredentialsStore::new();

        store
            .put("t1", Platform::TikTok, PlatformCredentials::new("old"))
            .await
            .unwrap();
        store
            .put("t1", Platform::TikTok, PlatformCredentials::new("new"))
            .await
            .unwrap();

        let found = store.get("t1", Platform::TikTok).await.unwrap().unwrap();
        assert_eq!(found.access_token, "new");
    }
}
