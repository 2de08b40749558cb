//! Generation cache for call-to-action labels.
//!
//! All entries live in one versioned JSON blob under [`CACHE_KEY`]:
//!
//! ```json
//! {"version":1,"entries":{"my-repo":{"cta":"Try It Now","timestamp":1718000000000,"hash":"-1a2b3c"}}}
//! ```
//!
//! An entry is served only while its fingerprint matches the current
//! repository name and description and it is younger than [`CACHE_TTL_MS`].
//! The cache never fails: missing storage, rejected writes, corrupt JSON
//! and foreign versions all behave like an empty cache.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::storage::KeyValueStorage;

/// Storage key of the cache blob.
pub const CACHE_KEY: &str = "repo-cta-cache";

/// Blob format version; any other version is discarded.
pub const CACHE_VERSION: u32 = 1;

/// Entry lifetime: 7 days in milliseconds.
pub const CACHE_TTL_MS: i64 = 7 * 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedCta {
    cta: String,
    timestamp: i64,
    hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheData {
    version: u32,
    entries: HashMap<String, CachedCta>,
}

impl CacheData {
    fn empty() -> Self {
        Self {
            version: CACHE_VERSION,
            entries: HashMap::new(),
        }
    }
}

/// Fingerprint of a repository's name and description.
///
/// 31-multiplier rolling hash over the UTF-16 code units of
/// `"<name>|<description>"`, wrapped to 32 bits and written in signed base
/// 36. Values match those produced by the site's browser code, so blobs
/// written there stay valid.
#[must_use]
pub fn fingerprint(name: &str, description: Option<&str>) -> String {
    let data = format!("{name}|{}", description.unwrap_or_default());
    let hash = data.encode_utf16().fold(0i32, |hash, unit| {
        hash.wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit))
    });
    to_signed_base36(hash)
}

fn to_signed_base36(value: i32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut magnitude = value.unsigned_abs();
    if magnitude == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while magnitude > 0 {
        let digit = DIGITS
            .get((magnitude % 36) as usize)
            .copied()
            .unwrap_or(b'0');
        digits.push(char::from(digit));
        magnitude /= 36;
    }
    if value < 0 {
        digits.push('-');
    }
    digits.iter().rev().collect()
}

/// Versioned, fingerprinted, time-limited cache of generated labels.
#[derive(Debug)]
pub struct GenerationCache {
    storage: Arc<dyn KeyValueStorage>,
    loaded: Mutex<Option<CacheData>>,
}

impl GenerationCache {
    /// Creates a cache over `storage`. Nothing is read until first use.
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self {
            storage,
            loaded: Mutex::new(None),
        }
    }

    /// Cached label for the repository, if still valid.
    #[must_use]
    pub fn get(&self, name: &str, description: Option<&str>) -> Option<String> {
        self.get_at(name, description, Utc::now().timestamp_millis())
    }

    /// [`GenerationCache::get`] evaluated at `now_ms` (Unix milliseconds).
    /// An expired entry is evicted.
    #[must_use]
    pub fn get_at(&self, name: &str, description: Option<&str>, now_ms: i64) -> Option<String> {
        if !self.storage.is_available() {
            return None;
        }
        let hash = fingerprint(name, description);
        let mut guard = self.loaded.lock().unwrap_or_else(PoisonError::into_inner);
        let data = guard.get_or_insert_with(|| self.load());

        let entry = data.entries.get(name)?;
        if entry.hash != hash {
            return None;
        }
        if now_ms.saturating_sub(entry.timestamp) > CACHE_TTL_MS {
            data.entries.remove(name);
            self.save(data);
            tracing::debug!(repo = name, "evicted expired cta");
            return None;
        }
        Some(entry.cta.clone())
    }

    /// Stores `cta` for the repository, replacing any previous entry.
    pub fn set(&self, name: &str, description: Option<&str>, cta: &str) {
        self.set_at(name, description, cta, Utc::now().timestamp_millis());
    }

    /// [`GenerationCache::set`] stamped with `now_ms`.
    pub fn set_at(&self, name: &str, description: Option<&str>, cta: &str, now_ms: i64) {
        if !self.storage.is_available() {
            return;
        }
        let mut guard = self.loaded.lock().unwrap_or_else(PoisonError::into_inner);
        let data = guard.get_or_insert_with(|| self.load());
        data.entries.insert(
            name.to_string(),
            CachedCta {
                cta: cta.to_string(),
                timestamp: now_ms,
                hash: fingerprint(name, description),
            },
        );
        self.save(data);
    }

    /// Drops every entry.
    pub fn clear(&self) {
        if !self.storage.is_available() {
            return;
        }
        if let Err(e) = self.storage.remove(CACHE_KEY) {
            tracing::debug!(error = %e, "failed to remove cta cache");
        }
        *self.loaded.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn load(&self) -> CacheData {
        match self.storage.get(CACHE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<CacheData>(&raw) {
                Ok(data) if data.version == CACHE_VERSION => data,
                Ok(data) => {
                    tracing::debug!(version = data.version, "discarding cta cache of other version");
                    CacheData::empty()
                }
                Err(e) => {
                    tracing::debug!(error = %e, "discarding unreadable cta cache");
                    CacheData::empty()
                }
            },
            Ok(None) => CacheData::empty(),
            Err(e) => {
                tracing::debug!(error = %e, "cta cache storage unreadable");
                CacheData::empty()
            }
        }
    }

    fn save(&self, data: &CacheData) {
        let raw = match serde_json::to_string(data) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::debug!(error = %e, "failed to serialize cta cache");
                return;
            }
        };
        if let Err(e) = self.storage.set(CACHE_KEY, &raw) {
            tracing::debug!(error = %e, "failed to persist cta cache");
        }
    }
}
