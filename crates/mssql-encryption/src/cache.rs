//! Decrypted column encryption key cache.
//!
//! Each registered provider owns one [`CekCache`]. Entries are keyed by the
//! master key path together with the encrypted CEK bytes, so two CEKs under
//! the same master key, or the same bytes under different master keys, are
//! cached independently.
//!
//! Expired entries are never returned. A lookup that finds one drops it, and
//! every insert sweeps the rest.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use zeroize::Zeroizing;

use crate::cmk::DEFAULT_KEY_LIFETIME;

/// A decrypted CEK shared between the cache and its users.
pub type PlaintextKey = Arc<Zeroizing<Vec<u8>>>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    master_key_path: String,
    encrypted_cek: Vec<u8>,
}

struct CacheEntry {
    key: PlaintextKey,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Thread-safe TTL cache of decrypted CEKs.
#[derive(Default)]
pub struct CekCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl CekCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a live entry.
    pub fn get(&self, master_key_path: &str, encrypted_cek: &[u8]) -> Option<PlaintextKey> {
        let key = CacheKey {
            master_key_path: master_key_path.to_string(),
            encrypted_cek: encrypted_cek.to_vec(),
        };
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(&key) {
                Some(entry) if entry.is_live(now) => {
                    tracing::trace!(key_path = %master_key_path, "CEK cache hit");
                    return Some(Arc::clone(&entry.key));
                }
                Some(_) => {}
                None => {
                    tracing::debug!(key_path = %master_key_path, expired = false, "CEK cache miss");
                    return None;
                }
            }
        }

        let mut entries = self.entries.write();
        // A concurrent insert may have refreshed the entry since the read.
        if entries.get(&key).is_some_and(|entry| !entry.is_live(now)) {
            entries.remove(&key);
        }
        tracing::debug!(key_path = %master_key_path, expired = true, "CEK cache miss");
        None
    }

    /// Store a decrypted CEK for `lifetime`, replacing any previous entry.
    pub fn insert(
        &self,
        master_key_path: &str,
        encrypted_cek: &[u8],
        plaintext: Vec<u8>,
        lifetime: Duration,
    ) -> PlaintextKey {
        let key = Arc::new(Zeroizing::new(plaintext));
        let now = Instant::now();
        let expires_at = now
            .checked_add(lifetime)
            .unwrap_or_else(|| now + DEFAULT_KEY_LIFETIME);

        let mut entries = self.entries.write();
        entries.retain(|_, entry| entry.is_live(now));
        entries.insert(
            CacheKey {
                master_key_path: master_key_path.to_string(),
                encrypted_cek: encrypted_cek.to_vec(),
            },
            CacheEntry {
                key: Arc::clone(&key),
                expires_at,
            },
        );
        key
    }

    /// Drop one entry. Returns whether it existed.
    pub fn remove(&self, master_key_path: &str, encrypted_cek: &[u8]) -> bool {
        self.entries
            .write()
            .remove(&CacheKey {
                master_key_path: master_key_path.to_string(),
                encrypted_cek: encrypted_cek.to_vec(),
            })
            .is_some()
    }

    /// Drop every expired entry.
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        self.entries.write().retain(|_, entry| entry.is_live(now));
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Number of entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl std::fmt::Debug for CekCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CekCache").field("len", &self.len()).finish()
    }
}
