//! Column master key provider registry.
//!
//! The registry maps provider names, as they appear in CEK table entries,
//! to a provider and its CEK cache. It is an ordinary value: build it at
//! startup, wrap it in an `Arc` and hand it to every pipeline that should
//! share providers and cached keys.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::cache::{CekCache, PlaintextKey};
use crate::cmk::{CmkProvider, DEFAULT_KEY_LIFETIME};
use crate::error::{CmkError, Error, Result};

/// A registered provider together with its cache.
pub struct CekProvider {
    provider: Arc<dyn CmkProvider>,
    cache: CekCache,
    default_lifetime: Duration,
}

impl CekProvider {
    /// Wrap a provider with an empty cache.
    pub fn new(provider: Arc<dyn CmkProvider>) -> Self {
        Self::with_default_lifetime(provider, DEFAULT_KEY_LIFETIME)
    }

    /// Wrap a provider, caching for `default_lifetime` when it sets none.
    pub fn with_default_lifetime(provider: Arc<dyn CmkProvider>, default_lifetime: Duration) -> Self {
        Self {
            provider,
            cache: CekCache::new(),
            default_lifetime,
        }
    }

    /// The provider itself.
    pub fn provider(&self) -> &Arc<dyn CmkProvider> {
        &self.provider
    }

    /// The provider's cache.
    pub fn cache(&self) -> &CekCache {
        &self.cache
    }

    /// Cache lifetime applied to keys from this provider.
    pub fn key_lifetime(&self) -> Duration {
        self.provider.key_lifetime().unwrap_or(self.default_lifetime)
    }

    /// Return the plaintext CEK, decrypting through the provider on a miss.
    ///
    /// Provider errors are returned unchanged and nothing is cached for them.
    /// Concurrent misses for the same key may each call the provider.
    pub async fn get_decrypted_key(
        &self,
        master_key_path: &str,
        encryption_algorithm: &str,
        encrypted_cek: &[u8],
    ) -> std::result::Result<PlaintextKey, CmkError> {
        if let Some(key) = self.cache.get(master_key_path, encrypted_cek) {
            return Ok(key);
        }

        let plaintext = self
            .provider
            .decrypt_column_encryption_key(master_key_path, encryption_algorithm, encrypted_cek)
            .await
            .inspect_err(|e| {
                tracing::warn!(key_path = %master_key_path, error = %e, "CEK decryption failed");
            })?;

        Ok(self
            .cache
            .insert(master_key_path, encrypted_cek, plaintext, self.key_lifetime()))
    }
}

impl std::fmt::Debug for CekProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CekProvider")
            .field("cache", &self.cache)
            .field("default_lifetime", &self.default_lifetime)
            .finish_non_exhaustive()
    }
}

/// Name-to-provider map shared by encryption pipelines.
pub struct CmkProviderRegistry {
    providers: RwLock<HashMap<String, Arc<CekProvider>>>,
    default_key_lifetime: Duration,
}

impl CmkProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::with_default_key_lifetime(DEFAULT_KEY_LIFETIME)
    }

    /// Create an empty registry whose caches default to `lifetime`.
    pub fn with_default_key_lifetime(lifetime: Duration) -> Self {
        Self {
            providers: RwLock::new(HashMap::new()),
            default_key_lifetime: lifetime,
        }
    }

    /// Create a registry holding `providers`.
    ///
    /// Fails on the first repeated name.
    pub fn with_providers<I, S>(providers: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Arc<dyn CmkProvider>)>,
        S: Into<String>,
    {
        let registry = Self::new();
        for (name, provider) in providers {
            registry.register(name, provider)?;
        }
        Ok(registry)
    }

    /// Register `provider` under `name`.
    ///
    /// Names are unique; registering a name twice fails and leaves the first
    /// registration in place.
    pub fn register(&self, name: impl Into<String>, provider: Arc<dyn CmkProvider>) -> Result<()> {
        let name = name.into();
        let mut providers = self.providers.write();
        if providers.contains_key(&name) {
            return Err(Error::DuplicateProvider(name));
        }
        tracing::debug!(provider = %name, "registered column master key provider");
        providers.insert(
            name,
            Arc::new(CekProvider::with_default_lifetime(provider, self.default_key_lifetime)),
        );
        Ok(())
    }

    /// Look up a provider.
    pub fn get(&self, name: &str) -> Option<Arc<CekProvider>> {
        self.providers.read().get(name).cloned()
    }

    /// Look up a provider, failing when it is not registered.
    pub fn require(&self, name: &str) -> Result<Arc<CekProvider>> {
        self.get(name)
            .ok_or_else(|| Error::ProviderNotRegistered(name.to_string()))
    }

    /// Snapshot of the registered providers.
    pub fn providers(&self) -> HashMap<String, Arc<CekProvider>> {
        self.providers.read().clone()
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.read().len()
    }

    /// Whether no provider is registered.
    pub fn is_empty(&self) -> bool {
        self.providers.read().is_empty()
    }
}

impl Default for CmkProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CmkProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<String> = self.providers.read().keys().cloned().collect();
        names.sort();
        f.debug_struct("CmkProviderRegistry")
            .field("providers", &names)
            .field("default_key_lifetime", &self.default_key_lifetime)
            .finish()
    }
}
