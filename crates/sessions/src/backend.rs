//! Pluggable key-value backend for the session store.
//!
//! The contract fits both a remote KV with native TTL and the
//! in-process map shipped here. For the in-process backend TTL is
//! enforced by the accessor; the sweep is opportunistic (runs on
//! writes), not a background task.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use da_domain::error::Result;

/// Blob storage with per-key expiry.
#[async_trait::async_trait]
pub trait StoreBackend: Send + Sync {
    async fn put(&self, key: &str, blob: String, expires_at: DateTime<Utc>) -> Result<()>;

    /// A record past its expiry is treated as absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn delete(&self, key: &str) -> Result<bool>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// In-process backend
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct Entry {
    blob: String,
    expires_at: DateTime<Utc>,
}

/// In-process map backend.
#[derive(Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        let now = Utc::now();
        self.entries
            .read()
            .values()
            .filter(|e| e.expires_at > now)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sweep(map: &mut HashMap<String, Entry>, now: DateTime<Utc>) {
        map.retain(|_, e| e.expires_at > now);
    }
}

#[async_trait::async_trait]
impl StoreBackend for MemoryBackend {
    async fn put(&self, key: &str, blob: String, expires_at: DateTime<Utc>) -> Result<()> {
        let mut entries = self.entries.write();
        Self::sweep(&mut entries, Utc::now());
        entries.insert(key.to_string(), Entry { blob, expires_at });
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Utc::now();

        // Fast path under the read lock.
        {
            let entries = self.entries.read();
            match entries.get(key) {
                None => return Ok(None),
                Some(e) if e.expires_at > now => return Ok(Some(e.blob.clone())),
                Some(_) => {}
            }
        }

        // Expired: reap it.
        self.entries.write().remove(key);
        Ok(None)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.entries.write().remove(key).is_some())
    }
}
