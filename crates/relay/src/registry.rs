//! Provider registry - directory of currently reachable providers
//!
//! Maps provider names to their live sessions. At most one session is
//! addressable under a name at a time; registering again under an existing
//! name displaces the old session (the caller is responsible for shutting
//! the displaced session down).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{RelayError, Result};
use crate::session::ProviderSession;

/// Concurrency-safe directory from provider name to live session
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    providers: RwLock<HashMap<String, Arc<ProviderSession>>>,
}

impl ProviderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a session under a name
    ///
    /// Returns the displaced session if the name was already registered.
    pub fn put(&self, name: &str, session: Arc<ProviderSession>) -> Option<Arc<ProviderSession>> {
        self.providers.write().insert(name.to_string(), session)
    }

    /// Look up the session for a name
    pub fn get(&self, name: &str) -> Result<Arc<ProviderSession>> {
        self.providers
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| RelayError::UnknownProvider {
                name: name.to_string(),
            })
    }

    /// Remove the mapping for `name`, but only if it still points at `session`
    ///
    /// A session tearing down after being displaced by a re-registration must
    /// not delete the newer entry. Returns whether the entry was removed.
    pub fn remove(&self, name: &str, session: &Arc<ProviderSession>) -> bool {
        let mut providers = self.providers.write();
        match providers.get(name) {
            Some(current) if Arc::ptr_eq(current, session) => {
                providers.remove(name);
                true
            }
            _ => false,
        }
    }

    /// Number of registered providers
    pub fn count(&self) -> usize {
        self.providers.read().len()
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
