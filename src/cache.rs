//! In-memory response cache with per-entry expiry.
//!
//! Entries live until their TTL elapses; an expired entry is treated as absent
//! and dropped the next time it is looked up. There is no size bound, the
//! proxy is single-user and the map only lives as long as the process.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use serde_json::Value;
use tokio::time::Instant;

use crate::proxy::CredentialClass;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub data: Value,
    pub expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Default)]
pub struct Cache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored value if present and unexpired. A stale entry is
    /// removed as a side effect.
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.lock();
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => Some(entry.data.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Stores `value` under `key`, replacing whatever was there.
    pub fn set(&self, key: impl Into<String>, value: Value, ttl: Duration) {
        let entry = CacheEntry {
            data: value,
            expires_at: Instant::now() + ttl,
        };
        self.lock().insert(key.into(), entry);
    }

    /// Number of entries currently held, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        // entries are replaced whole, so a poisoned map is still consistent
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Builds the key for a proxied response. The credential class is part of
/// the key so user and client responses for the same URL never collide.
pub fn cache_key(class: CredentialClass, url: &str) -> String {
    format!("{}::{}", class.as_str(), url)
}

/// Upstream resource families that get their own TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceClass {
    Playlist,
    Artist,
    Track,
    Search,
    Default,
}

/// Substring rules, checked in order; the first match wins.
const RESOURCE_RULES: &[(&str, ResourceClass)] = &[
    ("playlists", ResourceClass::Playlist),
    ("artists", ResourceClass::Artist),
    ("tracks", ResourceClass::Track),
    ("search", ResourceClass::Search),
];

impl ResourceClass {
    pub fn classify(path: &str) -> Self {
        RESOURCE_RULES
            .iter()
            .find(|(needle, _)| path.contains(needle))
            .map(|(_, class)| *class)
            .unwrap_or(ResourceClass::Default)
    }
}

/// TTLs per resource class.
#[derive(Debug, Clone)]
pub struct TtlPolicy {
    pub playlist: Duration,
    pub artist: Duration,
    pub track: Duration,
    pub search: Duration,
    pub default: Duration,
    pub name_resolution: Duration,
    pub metadata: Duration,
    pub conversion: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            playlist: Duration::from_secs(300),
            artist: Duration::from_secs(600),
            track: Duration::from_secs(600),
            search: Duration::from_secs(60),
            default: Duration::from_secs(300),
            name_resolution: Duration::from_secs(300),
            metadata: Duration::from_secs(300),
            conversion: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl TtlPolicy {
    pub fn for_class(&self, class: ResourceClass) -> Duration {
        match class {
            ResourceClass::Playlist => self.playlist,
            ResourceClass::Artist => self.artist,
            ResourceClass::Track => self.track,
            ResourceClass::Search => self.search,
            ResourceClass::Default => self.default,
        }
    }

    /// TTL for an upstream-relative path such as `artists/123/top-tracks`.
    pub fn for_path(&self, path: &str) -> Duration {
        self.for_class(ResourceClass::classify(path))
    }
}
