//! Response cache abstraction and the in-process implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use super::key::CacheKey;

/// A stored response. Payloads are the serialized route body.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub club_id: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Store consumed by the route pipeline.
///
/// `put` replaces any previous entry for the key; concurrent writers of the
/// same key are last-writer-wins.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Option<CacheEntry>;

    /// Like `get`, but leaves the hit and miss counters alone.
    async fn peek(&self, key: &CacheKey) -> Option<CacheEntry>;

    async fn put(&self, key: &CacheKey, payload: Value, ttl: Duration);

    async fn evict(&self, key: &CacheKey) -> bool;

    /// Drop every entry belonging to `club_id`. Returns the number removed.
    async fn evict_club(&self, club_id: &str) -> usize;

    fn stats(&self) -> CacheStats;
}

struct StoredEntry {
    entry: CacheEntry,
    inserted: Instant,
    deadline: Instant,
}

impl StoredEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }
}

pub struct InMemoryResponseCache {
    entries: DashMap<String, StoredEntry>,
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl InMemoryResponseCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: max_entries.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Remove expired entries, then the oldest ones until there is room
    /// for one more insert.
    fn make_room(&self, now: Instant) {
        self.entries.retain(|_, stored| !stored.is_expired(now));

        while self.entries.len() >= self.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|item| item.value().inserted)
                .map(|item| item.key().clone());
            match oldest {
                Some(key) => {
                    debug!(key = %key, "Evicting oldest cache entry");
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }
}

impl Default for InMemoryResponseCache {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl ResponseCache for InMemoryResponseCache {
    async fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let now = Instant::now();
        let found = self.entries.get(key.as_str()).map(|stored| {
            if stored.is_expired(now) {
                None
            } else {
                Some(stored.entry.clone())
            }
        });

        match found {
            Some(Some(entry)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry)
            }
            Some(None) => {
                self.entries
                    .remove_if(key.as_str(), |_, stored| stored.is_expired(now));
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    async fn peek(&self, key: &CacheKey) -> Option<CacheEntry> {
        let now = Instant::now();
        self.entries
            .get(key.as_str())
            .filter(|stored| !stored.is_expired(now))
            .map(|stored| stored.entry.clone())
    }

    async fn put(&self, key: &CacheKey, payload: Value, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }

        let now = Instant::now();
        if !self.entries.contains_key(key.as_str()) && self.entries.len() >= self.max_entries {
            self.make_room(now);
        }

        let created_at = Utc::now();
        let expires_at = created_at
            + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::zero());
        let entry = CacheEntry {
            key: key.as_str().to_string(),
            club_id: key.club_id().to_string(),
            payload,
            created_at,
            expires_at,
        };

        self.entries.insert(
            key.as_str().to_string(),
            StoredEntry {
                entry,
                inserted: now,
                deadline: now + ttl,
            },
        );
    }

    async fn evict(&self, key: &CacheKey) -> bool {
        self.entries.remove(key.as_str()).is_some()
    }

    async fn evict_club(&self, club_id: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, stored| stored.entry.club_id != club_id);
        before.saturating_sub(self.entries.len())
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }
}
