//! Short-lived cache of router verdicts for forward delegation
//!
//! Keys are SHA-256 digests, never the credentials themselves. Expired
//! entries are never served and are swept on every insert, so there is no
//! background task for this cache.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::trace;

/// Default verdict lifetime
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30);

/// Cached router verdict
#[derive(Debug, Clone, Copy)]
pub struct CacheEntry {
    pub valid: bool,
    pub expires_at: Instant,
}

#[derive(Debug)]
pub struct VerificationCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl VerificationCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Cached verdict, or `None` when absent or expired
    pub async fn get(&self, key: &str) -> Option<bool> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if Instant::now() >= entry.expires_at {
            return None;
        }
        Some(entry.valid)
    }

    /// Record a verdict and sweep expired entries
    pub async fn put(&self, key: impl Into<String>, valid: bool) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| now < entry.expires_at);
        let swept = before - entries.len();
        if swept > 0 {
            trace!(swept, "Swept expired verification entries");
        }
        entries.insert(
            key.into(),
            CacheEntry {
                valid,
                expires_at: now + self.ttl,
            },
        );
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

/// Cache key for a username/password pair
pub fn credential_key(username: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"cred\0");
    // Length prefix keeps ("ab","c") and ("a","bc") apart
    hasher.update((username.len() as u64).to_be_bytes());
    hasher.update(username.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Cache key for a cookie set, independent of cookie order
pub fn cookie_key<N, V>(cookies: &[(N, V)]) -> String
where
    N: AsRef<str>,
    V: AsRef<str>,
{
    let mut pairs: Vec<String> = cookies
        .iter()
        .map(|(name, value)| format!("{}={}", name.as_ref(), value.as_ref()))
        .collect();
    pairs.sort();

    let mut hasher = Sha256::new();
    hasher.update(b"cookie\0");
    for pair in &pairs {
        hasher.update((pair.len() as u64).to_be_bytes());
        hasher.update(pair.as_bytes());
    }
    hex::encode(hasher.finalize())
}
