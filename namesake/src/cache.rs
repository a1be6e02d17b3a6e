//! TTL-bounded store of aggregated result sets.
//!
//! Entries are keyed by the normalized subject name. Expiry is enforced
//! lazily: an expired entry is evicted the first time it is read.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::CacheConfig;
use crate::errors::CacheError;
use crate::models::{PaginationToken, ResultRecord};
use crate::utils::{epoch_ms, Clock, Timestamp};

/// One cached aggregated result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Normalized subject key.
    pub subject: String,
    /// Write time as Unix milliseconds.
    pub timestamp: i64,
    /// Every record aggregated so far, in session order.
    pub records: Vec<ResultRecord>,
    /// Continuation token, absent when the results are exhausted.
    pub token: Option<PaginationToken>,
}

impl CacheEntry {
    /// Age of the entry at `now` in milliseconds; negative ages count as zero.
    #[must_use]
    pub fn age_ms(&self, now: Timestamp) -> u64 {
        u64::try_from(epoch_ms(now) - self.timestamp).unwrap_or(0)
    }

    /// Whether the entry must be treated as absent at `now`.
    #[must_use]
    pub fn is_expired(&self, now: Timestamp, ttl: Duration) -> bool {
        u128::from(self.age_ms(now)) >= ttl.as_millis()
    }

    /// Encodes the entry as flat JSON text.
    pub fn to_text(&self) -> Result<String, CacheError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes an entry from its flat JSON text.
    pub fn from_text(text: &str) -> Result<Self, CacheError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Normalizes a subject name into a cache key.
///
/// Lower-cases, trims and collapses whitespace, then percent-encodes.
#[must_use]
pub fn normalize_subject(subject: &str) -> String {
    let collapsed = subject.split_whitespace().collect::<Vec<_>>().join(" ");
    urlencoding::encode(&collapsed.to_lowercase()).into_owned()
}

/// Protocol for aggregated-result storage.
pub trait CacheStore: Send + Sync {
    /// Returns the live entry for `subject`, evicting it if expired.
    fn get(&self, subject: &str) -> Option<CacheEntry>;

    /// Writes an entry for `subject`, replacing any previous one.
    fn put(&self, subject: &str, records: Vec<ResultRecord>, token: Option<PaginationToken>);

    /// Deletes the entry for `subject`.
    fn remove(&self, subject: &str);

    /// Clears all entries.
    fn clear(&self);
}

/// In-memory cache store with an injected clock.
pub struct InMemoryCacheStore {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for InMemoryCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCacheStore")
            .field("entries", &self.entries.lock().len())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl InMemoryCacheStore {
    /// Creates a store with the default TTL.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::from_config(&CacheConfig::default(), clock)
    }

    /// Creates a store from configuration.
    #[must_use]
    pub fn from_config(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: config.ttl(),
            clock,
        }
    }

    /// Overrides the TTL.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Returns the number of stored entries, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl CacheStore for InMemoryCacheStore {
    fn get(&self, subject: &str) -> Option<CacheEntry> {
        let key = normalize_subject(subject);
        let now = self.clock.now();
        let mut entries = self.entries.lock();

        if let Some(entry) = entries.get(&key) {
            if entry.is_expired(now, self.ttl) {
                debug!(subject = %key, age_ms = entry.age_ms(now), "Evicting expired cache entry");
                entries.remove(&key);
                return None;
            }
            return Some(entry.clone());
        }

        None
    }

    fn put(&self, subject: &str, records: Vec<ResultRecord>, token: Option<PaginationToken>) {
        let key = normalize_subject(subject);
        let entry = CacheEntry {
            subject: key.clone(),
            timestamp: epoch_ms(self.clock.now()),
            records,
            token,
        };
        self.entries.lock().insert(key, entry);
    }

    fn remove(&self, subject: &str) {
        self.entries.lock().remove(&normalize_subject(subject));
    }

    fn clear(&self) {
        self.entries.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ManualClock;
    use pretty_assertions::assert_eq;

    fn store_at(ms: i64) -> (Arc<ManualClock>, InMemoryCacheStore) {
        let clock = Arc::new(ManualClock::at_epoch_ms(ms));
        let store = InMemoryCacheStore::new(clock.clone());
        (clock, store)
    }

    fn record(id: &str) -> ResultRecord {
        ResultRecord::new(format!("Author {id}"), format!("https://x/citations?user={id}"))
    }

    #[test]
    fn test_normalize_subject() {
        assert_eq!(normalize_subject("  Ada   LOVELACE "), "ada%20lovelace");
        assert_eq!(normalize_subject("José/Ñ"), "jos%C3%A9%2F%C3%B1");
        assert_eq!(normalize_subject("ada lovelace"), normalize_subject("Ada Lovelace"));
    }

    #[test]
    fn test_put_then_get() {
        let (_clock, store) = store_at(1_000);
        store.put("Ada Lovelace", vec![record("a")], Some(PaginationToken::Start(10)));

        let entry = store.get("ada  lovelace").unwrap();
        assert_eq!(entry.subject, "ada%20lovelace");
        assert_eq!(entry.timestamp, 1_000);
        assert_eq!(entry.records, vec![record("a")]);
        assert_eq!(entry.token, Some(PaginationToken::Start(10)));
    }

    #[test]
    fn test_ttl_boundary() {
        let (clock, store) = store_at(0);
        store.put("ada", vec![record("a")], None);

        clock.advance_ms(299_999);
        assert!(store.get("ada").is_some());

        clock.advance_ms(1);
        assert!(store.get("ada").is_none());
        assert!(store.is_empty(), "expired entry is evicted on read");
    }

    #[test]
    fn test_expired_entry_stays_until_read() {
        let (clock, store) = store_at(0);
        store.put("ada", vec![], None);
        clock.advance_ms(400_000);
        assert_eq!(store.len(), 1);
        assert!(store.get("ada").is_none());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_put_replaces_entry() {
        let (clock, store) = store_at(0);
        store.put("ada", vec![record("a"), record("b")], Some(PaginationToken::Cstart(20)));
        clock.advance_ms(10);
        store.put("ADA", vec![record("c")], None);

        let entry = store.get("ada").unwrap();
        assert_eq!(entry.records, vec![record("c")]);
        assert_eq!(entry.token, None);
        assert_eq!(entry.timestamp, 10);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove_and_clear() {
        let (_clock, store) = store_at(0);
        store.put("a", vec![], None);
        store.put("b", vec![], None);
        store.remove("A");
        assert!(store.get("a").is_none());
        assert_eq!(store.len(), 1);
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_custom_ttl() {
        let (clock, store) = store_at(0);
        let store = store.with_ttl(Duration::from_millis(50));
        store.put("a", vec![], None);
        clock.advance_ms(50);
        assert!(store.get("a").is_none());
    }

    #[test]
    fn test_entry_text_encoding() {
        let entry = CacheEntry {
            subject: "ada".to_string(),
            timestamp: 42,
            records: vec![record("a").with_citation_count(3)],
            token: Some(PaginationToken::AfterAuthor("XyZ".to_string())),
        };

        let text = entry.to_text().unwrap();
        assert!(text.contains("\"after_author\":\"XyZ\""));
        assert_eq!(CacheEntry::from_text(&text).unwrap(), entry);
        assert!(CacheEntry::from_text("{not json").is_err());
    }

    #[test]
    fn test_entry_age_never_negative() {
        let entry = CacheEntry {
            subject: "a".to_string(),
            timestamp: 5_000,
            records: vec![],
            token: None,
        };
        assert_eq!(entry.age_ms(crate::utils::from_epoch_ms(1_000)), 0);
    }
}
