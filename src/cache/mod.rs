//! Cache replacement policies.
//!
//! Every caching node owns one [`CachePolicy`]: a bounded associative
//! store keyed by content id. The trait is deliberately small — the
//! engine only needs lookup-with-side-effects, insert-with-eviction, and
//! non-mutating inspection for collectors:
//!
//! - [`get`](CachePolicy::get) consults the store and updates whatever
//!   ordering the policy maintains (recency, frequency).
//! - [`put`](CachePolicy::put) inserts and reports the evicted key, so
//!   strategies and collectors can observe replacement behavior exactly.
//! - [`has`](CachePolicy::has) / [`dump`](CachePolicy::dump) never touch
//!   policy state; they exist for metric collection and must not be used
//!   in place of `get` during simulation.
//!
//! Policies are fully deterministic: `RAND` draws evictions from its own
//! seeded generator, never from a global one.

mod policies;

pub use policies::{Fifo, Lfu, Lru, Rand};

use crate::error::{Result, SimError};
use crate::types::ContentId;

/// A bounded associative store keyed by content id.
pub trait CachePolicy {
    /// Look up a content, updating the policy's internal ordering.
    ///
    /// Returns `true` on a hit.
    fn get(&mut self, content: ContentId) -> bool;

    /// Insert a content, evicting if the store is full.
    ///
    /// Returns the evicted key, or `None` when nothing was displaced
    /// (store not full, or the key was already present).
    fn put(&mut self, content: ContentId) -> Option<ContentId>;

    /// Non-mutating membership test.
    fn has(&self, content: ContentId) -> bool;

    /// Remove a content. Returns `true` if it was present.
    fn remove(&mut self, content: ContentId) -> bool;

    /// Contents currently stored, best-retained first.
    fn dump(&self) -> Vec<ContentId>;

    /// Number of contents currently stored.
    fn len(&self) -> usize;

    /// Whether the store is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Capacity of the store.
    fn maxlen(&self) -> usize;
}

impl std::fmt::Debug for dyn CachePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachePolicy").field("maxlen", &self.maxlen()).finish()
    }
}

/// A cache that stores nothing.
///
/// Used to run cache-oblivious baselines through the same machinery:
/// every lookup misses and every insertion is dropped.
#[derive(Debug, Clone)]
pub struct Null {
    maxlen: usize,
}

impl Null {
    pub fn new(maxlen: usize) -> Self {
        Self { maxlen }
    }
}

impl CachePolicy for Null {
    fn get(&mut self, _content: ContentId) -> bool {
        false
    }

    fn put(&mut self, _content: ContentId) -> Option<ContentId> {
        None
    }

    fn has(&self, _content: ContentId) -> bool {
        false
    }

    fn remove(&mut self, _content: ContentId) -> bool {
        false
    }

    fn dump(&self) -> Vec<ContentId> {
        Vec::new()
    }

    fn len(&self) -> usize {
        0
    }

    fn maxlen(&self) -> usize {
        self.maxlen
    }
}

/// Build a policy from its registry name.
///
/// `seed` feeds the `RAND` policy's eviction generator; the other
/// policies ignore it.
pub fn build_policy(name: &str, maxlen: usize, seed: u64) -> Result<Box<dyn CachePolicy>> {
    match name {
        "LRU" => Ok(Box::new(Lru::new(maxlen))),
        "LFU" => Ok(Box::new(Lfu::new(maxlen))),
        "FIFO" => Ok(Box::new(Fifo::new(maxlen))),
        "RAND" => Ok(Box::new(Rand::new(maxlen, seed))),
        "NULL" => Ok(Box::new(Null::new(maxlen))),
        other => Err(SimError::Config(format!(
            "unknown cache policy '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_policy_never_stores() {
        let mut cache = Null::new(4);
        assert_eq!(cache.put(ContentId(1)), None);
        assert!(!cache.get(ContentId(1)));
        assert!(!cache.has(ContentId(1)));
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.maxlen(), 4);
        assert!(cache.dump().is_empty());
    }

    #[test]
    fn registry_builds_all_policies() {
        for name in ["LRU", "LFU", "FIFO", "RAND", "NULL"] {
            let cache = build_policy(name, 2, 7).unwrap();
            assert_eq!(cache.maxlen(), 2);
        }
    }

    #[test]
    fn registry_rejects_unknown_name() {
        let err = build_policy("ARC", 2, 0).unwrap_err();
        assert!(err.to_string().contains("ARC"));
    }
}
