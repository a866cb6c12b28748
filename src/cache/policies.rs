//! The stock replacement policies: LRU, LFU, FIFO, RAND.
//!
//! Caches in this simulator are small (tens to thousands of entries), so
//! the implementations favor exactness and observability over asymptotic
//! cleverness: linear scans over a `VecDeque` are cheap at these sizes
//! and keep eviction order trivially auditable.

use std::collections::{HashMap, VecDeque};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::CachePolicy;
use crate::types::ContentId;

/// Least Recently Used. Both hits and re-insertions refresh recency.
#[derive(Debug, Clone)]
pub struct Lru {
    // Front is most recently used.
    entries: VecDeque<ContentId>,
    maxlen: usize,
}

impl Lru {
    pub fn new(maxlen: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(maxlen),
            maxlen,
        }
    }

    fn move_to_front(&mut self, content: ContentId) -> bool {
        if let Some(pos) = self.entries.iter().position(|&c| c == content) {
            self.entries.remove(pos);
            self.entries.push_front(content);
            true
        } else {
            false
        }
    }
}

impl CachePolicy for Lru {
    fn get(&mut self, content: ContentId) -> bool {
        self.move_to_front(content)
    }

    fn put(&mut self, content: ContentId) -> Option<ContentId> {
        if self.move_to_front(content) {
            return None;
        }
        self.entries.push_front(content);
        if self.entries.len() > self.maxlen {
            self.entries.pop_back()
        } else {
            None
        }
    }

    fn has(&self, content: ContentId) -> bool {
        self.entries.contains(&content)
    }

    fn remove(&mut self, content: ContentId) -> bool {
        if let Some(pos) = self.entries.iter().position(|&c| c == content) {
            self.entries.remove(pos);
            true
        } else {
            false
        }
    }

    fn dump(&self) -> Vec<ContentId> {
        self.entries.iter().copied().collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn maxlen(&self) -> usize {
        self.maxlen
    }
}

/// Least Frequently Used, with least-recent touch breaking frequency ties.
#[derive(Debug, Clone)]
pub struct Lfu {
    // content -> (hit count, last-touch tick)
    entries: HashMap<ContentId, (u64, u64)>,
    tick: u64,
    maxlen: usize,
}

impl Lfu {
    pub fn new(maxlen: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(maxlen),
            tick: 0,
            maxlen,
        }
    }

    fn touch(&mut self, content: ContentId) -> bool {
        self.tick += 1;
        let tick = self.tick;
        match self.entries.get_mut(&content) {
            Some(entry) => {
                entry.0 += 1;
                entry.1 = tick;
                true
            }
            None => false,
        }
    }

    fn victim(&self) -> Option<ContentId> {
        self.entries
            .iter()
            .min_by_key(|&(_, &(freq, tick))| (freq, tick))
            .map(|(&content, _)| content)
    }
}

impl CachePolicy for Lfu {
    fn get(&mut self, content: ContentId) -> bool {
        self.touch(content)
    }

    fn put(&mut self, content: ContentId) -> Option<ContentId> {
        if self.touch(content) {
            return None;
        }
        let evicted = if self.entries.len() >= self.maxlen {
            let victim = self.victim();
            if let Some(v) = victim {
                self.entries.remove(&v);
            }
            victim
        } else {
            None
        };
        self.tick += 1;
        self.entries.insert(content, (1, self.tick));
        evicted
    }

    fn has(&self, content: ContentId) -> bool {
        self.entries.contains_key(&content)
    }

    fn remove(&mut self, content: ContentId) -> bool {
        self.entries.remove(&content).is_some()
    }

    fn dump(&self) -> Vec<ContentId> {
        // Most frequently used first.
        let mut all: Vec<_> = self.entries.iter().map(|(&c, &v)| (c, v)).collect();
        all.sort_by(|a, b| (b.1).cmp(&a.1));
        all.into_iter().map(|(c, _)| c).collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn maxlen(&self) -> usize {
        self.maxlen
    }
}

/// First In First Out. Hits do not refresh insertion order.
#[derive(Debug, Clone)]
pub struct Fifo {
    // Front is newest.
    entries: VecDeque<ContentId>,
    maxlen: usize,
}

impl Fifo {
    pub fn new(maxlen: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(maxlen),
            maxlen,
        }
    }
}

impl CachePolicy for Fifo {
    fn get(&mut self, content: ContentId) -> bool {
        self.entries.contains(&content)
    }

    fn put(&mut self, content: ContentId) -> Option<ContentId> {
        if self.entries.contains(&content) {
            return None;
        }
        self.entries.push_front(content);
        if self.entries.len() > self.maxlen {
            self.entries.pop_back()
        } else {
            None
        }
    }

    fn has(&self, content: ContentId) -> bool {
        self.entries.contains(&content)
    }

    fn remove(&mut self, content: ContentId) -> bool {
        if let Some(pos) = self.entries.iter().position(|&c| c == content) {
            self.entries.remove(pos);
            true
        } else {
            false
        }
    }

    fn dump(&self) -> Vec<ContentId> {
        self.entries.iter().copied().collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn maxlen(&self) -> usize {
        self.maxlen
    }
}

/// Random replacement with a seedable eviction generator.
#[derive(Debug, Clone)]
pub struct Rand {
    entries: Vec<ContentId>,
    rng: StdRng,
    maxlen: usize,
}

impl Rand {
    pub fn new(maxlen: usize, seed: u64) -> Self {
        Self {
            entries: Vec::with_capacity(maxlen),
            rng: StdRng::seed_from_u64(seed),
            maxlen,
        }
    }
}

impl CachePolicy for Rand {
    fn get(&mut self, content: ContentId) -> bool {
        self.entries.contains(&content)
    }

    fn put(&mut self, content: ContentId) -> Option<ContentId> {
        if self.entries.contains(&content) {
            return None;
        }
        let evicted = if self.entries.len() >= self.maxlen && !self.entries.is_empty() {
            let victim = self.rng.gen_range(0..self.entries.len());
            Some(self.entries.swap_remove(victim))
        } else {
            None
        };
        self.entries.push(content);
        evicted
    }

    fn has(&self, content: ContentId) -> bool {
        self.entries.contains(&content)
    }

    fn remove(&mut self, content: ContentId) -> bool {
        if let Some(pos) = self.entries.iter().position(|&c| c == content) {
            self.entries.remove(pos);
            true
        } else {
            false
        }
    }

    fn dump(&self) -> Vec<ContentId> {
        self.entries.clone()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn maxlen(&self) -> usize {
        self.maxlen
    }
}
