//! Adapter registry: caches adapter instances per credential fingerprint
//!
//! Repeated publish calls for the same (platform, credentials) pair
//! reuse an already-authenticated adapter instead of re-running the
//! authentication handshake. Entries live until explicitly removed or
//! the process restarts; there is no expiry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::model::{Platform, PlatformCredentials};
use crate::ports::PlatformAdapter;

/// Cache key: platform plus a fingerprint derived from the credential's
/// token prefix and application id, never the full secret
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegistryKey {
    pub platform: Platform,
    pub fingerprint: String,
}

impl RegistryKey {
    pub fn new(platform: Platform, credentials: &PlatformCredentials) -> Self {
        Self {
            platform,
            fingerprint: credentials.fingerprint(platform),
        }
    }
}

/// Shared adapter cache; insert/lookup/remove are the only operations
/// requiring mutual exclusion
#[derive(Default)]
pub struct AdapterRegistry {
    entries: Mutex<HashMap<RegistryKey, Arc<dyn PlatformAdapter>>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an adapter under its key, replacing any previous entry
    pub fn register(&self, key: RegistryKey, adapter: Arc<dyn PlatformAdapter>) {
        self.entries.lock().unwrap().insert(key, adapter);
    }

    /// Cached adapter for the key, if present
    pub fn get(&self, key: &RegistryKey) -> Option<Arc<dyn PlatformAdapter>> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    /// Drop one entry (e.g., after a forced credential rotation)
    pub fn remove(&self, key: &RegistryKey) -> Option<Arc<dyn PlatformAdapter>> {
        self.entries.lock().unwrap().remove(key)
    }

    /// Drop every cached adapter
    pub fn clear_all(&self) {
        self.entries.lock().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
