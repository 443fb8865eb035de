//! TTL- and size-bounded store deciding whether a pattern has already been
//! surfaced to the user.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::Path;
use std::sync::RwLock;
use tracing::{debug, warn};

use crate::models::CacheAction;

/// Hard cap on the store's estimated size.
pub const MAX_CACHE_BYTES: usize = 10 * 1024 * 1024;

/// Fixed per-entry overhead on top of the identity strings.
const ENTRY_OVERHEAD_BYTES: usize = 96;

/// Entries older than this are logically expired even before physical
/// eviction.
pub fn entry_ttl() -> Duration {
    Duration::days(7)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub identity: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub dismissed: bool,
    pub shown: bool,
}

impl CacheEntry {
    fn new(identity: String, now: DateTime<Utc>) -> Self {
        CacheEntry {
            identity,
            created_at: now,
            expires_at: now + entry_ttl(),
            dismissed: false,
            shown: false,
        }
    }

    /// Expiry is absolute from creation; dismissal bypasses it.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        !self.dismissed && now >= self.expires_at
    }

    fn size_estimate(&self) -> usize {
        // Identity is held twice: as map key and in the insertion order.
        self.identity.len() * 2 + ENTRY_OVERHEAD_BYTES
    }
}

/// Ordered-by-insertion mapping of identity to entry with a running size
/// estimate. Invariant: `total_bytes <= MAX_CACHE_BYTES` after every insert.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheStore {
    entries: HashMap<String, CacheEntry>,
    insertion_order: VecDeque<String>,
    total_bytes: usize,
}

impl CacheStore {
    fn remove(&mut self, identity: &str) {
        if let Some(entry) = self.entries.remove(identity) {
            self.total_bytes = self.total_bytes.saturating_sub(entry.size_estimate());
        }
        self.insertion_order.retain(|id| id != identity);
    }

    /// Evict oldest-first until under the cap. Dismissed tombstones are
    /// spared on the first pass and removed only if the cap still cannot be
    /// met without them.
    fn evict_to_size_limit(&mut self) -> usize {
        let mut evicted = 0;
        while self.total_bytes > MAX_CACHE_BYTES {
            let victim = self
                .insertion_order
                .iter()
                .find(|id| self.entries.get(*id).map(|e| !e.dismissed).unwrap_or(false))
                .cloned()
                .or_else(|| self.insertion_order.front().cloned());
            match victim {
                Some(id) => {
                    self.remove(&id);
                    evicted += 1;
                }
                None => break,
            }
        }
        evicted
    }

    /// Rebuild the derived size counter and check internal consistency.
    /// Returns false when the snapshot is corrupt.
    fn rehydrate(&mut self) -> bool {
        if self.insertion_order.len() != self.entries.len() {
            return false;
        }
        let mut total = 0;
        for id in &self.insertion_order {
            match self.entries.get(id) {
                Some(entry) => total += entry.size_estimate(),
                None => return false,
            }
        }
        self.total_bytes = total;
        true
    }
}

/// The notification cache. Mutations are serialized behind the write lock;
/// suppression checks share the read lock and proceed concurrently.
#[derive(Default)]
pub struct NotificationCache {
    store: RwLock<CacheStore>,
}

impl NotificationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a cache snapshot from disk. Any corruption (unreadable file,
    /// bad JSON, inconsistent internal state) reinitializes an empty cache
    /// and never fails the caller.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::new();
        }
        let store = match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<CacheStore>(&contents) {
                Ok(mut store) => {
                    if store.rehydrate() {
                        debug!(entries = store.entries.len(), "loaded notification cache");
                        store
                    } else {
                        warn!(path = %path.display(), "notification cache inconsistent, reinitializing");
                        CacheStore::default()
                    }
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "notification cache corrupt, reinitializing");
                    CacheStore::default()
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "notification cache unreadable, reinitializing");
                CacheStore::default()
            }
        };
        NotificationCache {
            store: RwLock::new(store),
        }
    }

    /// Persist a snapshot so dismissals survive restarts.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        let store = self
            .store
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(&*store)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// An occurrence is suppressed iff an unexpired or dismissed entry
    /// exists for its identity.
    pub fn should_suppress(&self, identity: &str) -> bool {
        self.should_suppress_at(identity, Utc::now())
    }

    pub fn should_suppress_at(&self, identity: &str, now: DateTime<Utc>) -> bool {
        let store = self
            .store
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        store
            .entries
            .get(identity)
            .map(|entry| entry.dismissed || !entry.is_expired_at(now))
            .unwrap_or(false)
    }

    /// Record a presentation-layer action for an identity and report whether
    /// it was already suppressed beforehand.
    pub fn record(&self, identity: &str, action: CacheAction) -> bool {
        self.record_at(identity, action, Utc::now())
    }

    pub fn record_at(&self, identity: &str, action: CacheAction, now: DateTime<Utc>) -> bool {
        let mut guard = self
            .store
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let store = &mut *guard;

        let was_suppressed = store
            .entries
            .get(identity)
            .map(|entry| entry.dismissed || !entry.is_expired_at(now))
            .unwrap_or(false);

        let needs_refresh = store
            .entries
            .get(identity)
            .map(|entry| entry.is_expired_at(now))
            .unwrap_or(false);
        if needs_refresh {
            // Re-surfacing an expired identity starts a fresh 7-day window
            // and a fresh position in creation order.
            if let Some(entry) = store.entries.get_mut(identity) {
                entry.created_at = now;
                entry.expires_at = now + entry_ttl();
            }
            store.insertion_order.retain(|id| id != identity);
            store.insertion_order.push_back(identity.to_string());
        }

        match store.entries.get_mut(identity) {
            Some(entry) => match action {
                CacheAction::Shown => entry.shown = true,
                // Dismissal is permanent for this identity.
                CacheAction::Dismissed => entry.dismissed = true,
            },
            None => {
                let mut entry = CacheEntry::new(identity.to_string(), now);
                match action {
                    CacheAction::Shown => entry.shown = true,
                    CacheAction::Dismissed => entry.dismissed = true,
                }
                store.total_bytes += entry.size_estimate();
                store.insertion_order.push_back(identity.to_string());
                store.entries.insert(identity.to_string(), entry);
                let evicted = store.evict_to_size_limit();
                if evicted > 0 {
                    debug!(evicted, "size-driven cache eviction");
                }
            }
        }

        was_suppressed
    }

    /// Physically remove logically expired entries.
    pub fn evict_expired(&self) -> usize {
        self.evict_expired_at(Utc::now())
    }

    pub fn evict_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut store = self
            .store
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let expired: Vec<String> = store
            .entries
            .values()
            .filter(|entry| entry.is_expired_at(now))
            .map(|entry| entry.identity.clone())
            .collect();
        for identity in &expired {
            store.remove(identity);
        }
        expired.len()
    }

    /// Enforce the size cap immediately. The cap is normally maintained
    /// after every insert; this exists for hosts that want an explicit
    /// maintenance pass.
    pub fn evict_to_size_limit(&self) -> usize {
        let mut store = self
            .store
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        store.evict_to_size_limit()
    }

    pub fn len(&self) -> usize {
        self.store
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_bytes(&self) -> usize {
        self.store
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .total_bytes
    }
}
