//! Digest cache for the download endpoint.
//!
//! Holds the full text of recent ingests keyed by ingest id so that a client
//! whose inline content was cropped can fetch everything.
//! - Expiry: entries older than the TTL are treated as missing and purged on insert
//! - Capacity: inserting into a full cache evicts the oldest entry
//!
//! Used by: `QueryProcessor::process()` (insert, stats) and the download route (get)

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::error::{AppError, Result};

/// A stored digest plus what is needed to name the download.
#[derive(Debug, Clone)]
pub struct CachedDigest {
    pub slug: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

pub struct DigestCache {
    entries: RwLock<HashMap<Uuid, CachedDigest>>,
    ttl: Duration,
    capacity: usize,
}

impl DigestCache {
    pub fn new(ttl_secs: u64, capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: Duration::seconds(ttl_secs as i64),
            capacity: capacity.max(1),
        }
    }

    fn is_expired(&self, entry: &CachedDigest, now: DateTime<Utc>) -> bool {
        now - entry.created_at > self.ttl
    }

    pub fn insert(&self, id: Uuid, slug: &str, text: String) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| AppError::Internal("Lock poisoned".to_string()))?;
        let now = Utc::now();

        entries.retain(|_, entry| !self.is_expired(entry, now));

        while entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.created_at)
                .map(|(id, _)| *id);
            match oldest {
                Some(oldest) => {
                    entries.remove(&oldest);
                }
                None => break,
            }
        }

        entries.insert(
            id,
            CachedDigest {
                slug: slug.to_string(),
                text,
                created_at: now,
            },
        );
        Ok(())
    }

    pub fn get(&self, id: &Uuid) -> Result<Option<CachedDigest>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| AppError::Internal("Lock poisoned".to_string()))?;
        Ok(entries
            .get(id)
            .filter(|entry| !self.is_expired(entry, Utc::now()))
            .cloned())
    }

    /// Get cache statistics for debugging
    pub fn stats(&self) -> CacheStats {
        let entries = match self.entries.read() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        CacheStats {
            entries: entries.len(),
            total_bytes: entries.values().map(|e| e.text.len()).sum(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub total_bytes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let cache = DigestCache::new(60, 4);
        let id = Uuid::new_v4();
        cache.insert(id, "user-repo", "digest".to_string()).unwrap();

        let entry = cache.get(&id).unwrap().unwrap();
        assert_eq!(entry.slug, "user-repo");
        assert_eq!(entry.text, "digest");
        assert!(cache.get(&Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let cache = DigestCache::new(60, 2);
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        for id in &ids {
            cache.insert(*id, "s", "t".to_string()).unwrap();
            std::thread::sleep(std::time::Duration::from_millis(2));
        }

        assert!(cache.get(&ids[0]).unwrap().is_none());
        assert!(cache.get(&ids[1]).unwrap().is_some());
        assert!(cache.get(&ids[2]).unwrap().is_some());
        assert_eq!(cache.stats().entries, 2);
    }

    #[test]
    fn test_zero_ttl_expires_entries() {
        let cache = DigestCache::new(0, 2);
        let id = Uuid::new_v4();
        cache.insert(id, "s", "t".to_string()).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(cache.get(&id).unwrap().is_none());
    }
}
