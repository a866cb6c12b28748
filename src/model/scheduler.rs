//! Two-heap event scheduler.
//!
//! The engine interleaves two independent event sources: the *link heap*
//! (packet arrivals over links) and one *cache-service heap per node*
//! (pending cache reads/writes), plus a single-server slot per node
//! holding the cache operation currently in service.
//!
//! Ordering is by event time with a stable FIFO tie-break: every push —
//! into any heap — takes the next value of one global sequence counter,
//! so ties within a heap resolve in push order and ties across
//! cache-service heaps resolve in global push order. The link/cache
//! precedence on equal times is the driver's decision, not the
//! scheduler's.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};

use ordered_float::OrderedFloat;

use crate::error::{Result, SimError};
use crate::types::{Event, NodeId};

#[derive(Debug, Clone)]
struct Entry {
    time: OrderedFloat<f64>,
    seq: u64,
    event: Event,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.time, self.seq).cmp(&(other.time, other.seq))
    }
}

/// Min-heap of events ordered by `(time, push sequence)`.
#[derive(Debug, Default)]
struct EventHeap {
    heap: BinaryHeap<Reverse<Entry>>,
}

impl EventHeap {
    fn push(&mut self, seq: u64, event: Event) {
        self.heap.push(Reverse(Entry {
            time: OrderedFloat(event.time),
            seq,
            event,
        }));
    }

    fn pop(&mut self) -> Option<Event> {
        self.heap.pop().map(|Reverse(entry)| entry.event)
    }

    fn peek(&self) -> Option<&Entry> {
        self.heap.peek().map(|Reverse(entry)| entry)
    }

    fn iter(&self) -> impl Iterator<Item = &Event> {
        self.heap.iter().map(|Reverse(entry)| &entry.event)
    }

    fn len(&self) -> usize {
        self.heap.len()
    }

    fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

/// The two-priority-queue time discipline.
#[derive(Debug, Default)]
pub struct Scheduler {
    link: EventHeap,
    // Created lazily: a node appears here once it has seen a cache op.
    cache: HashMap<NodeId, EventHeap>,
    server: HashMap<NodeId, Event>,
    seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_seq(&mut self) -> u64 {
        let seq = self.seq;
        self.seq += 1;
        seq
    }

    /// Enqueue a link event.
    pub fn push_link(&mut self, event: Event) {
        let seq = self.next_seq();
        self.link.push(seq, event);
    }

    /// Dequeue the earliest link event.
    pub fn pop_link(&mut self) -> Result<Event> {
        self.link.pop().ok_or(SimError::EmptyQueue)
    }

    /// The earliest link event, if any.
    pub fn peek_link(&self) -> Option<&Event> {
        self.link.peek().map(|entry| &entry.event)
    }

    /// Enqueue a cache-service event at `node`.
    pub fn push_cache(&mut self, node: NodeId, event: Event) {
        let seq = self.next_seq();
        self.cache.entry(node).or_default().push(seq, event);
    }

    /// Dequeue the earliest cache-service event at `node`.
    pub fn pop_cache(&mut self, node: NodeId) -> Result<Event> {
        self.cache
            .get_mut(&node)
            .and_then(EventHeap::pop)
            .ok_or(SimError::EmptyQueue)
    }

    /// The earliest cache-service event across all nodes, breaking
    /// equal-time ties by global push order.
    pub fn peek_cache_min(&self) -> Option<&Event> {
        self.cache
            .values()
            .filter_map(EventHeap::peek)
            .min_by_key(|entry| (entry.time, entry.seq))
            .map(|entry| &entry.event)
    }

    /// Number of pending (not in-service) cache ops at `node`.
    pub fn cache_queue_len(&self, node: NodeId) -> usize {
        self.cache.get(&node).map_or(0, EventHeap::len)
    }

    /// Pending cache ops at `node`, in no particular order.
    pub fn cache_events(&self, node: NodeId) -> impl Iterator<Item = &Event> {
        self.cache.get(&node).into_iter().flat_map(EventHeap::iter)
    }

    /// Nodes whose cache-service queue has ever been used, with their
    /// current pending lengths.
    pub fn known_cache_queues(&self) -> impl Iterator<Item = (NodeId, usize)> + '_ {
        self.cache.iter().map(|(&node, heap)| (node, heap.len()))
    }

    /// Move `event` into the server slot of `node`, stamped with `t`.
    ///
    /// The slot holds the operation currently in service; it is replaced
    /// at the next cache-service dispatch at that node.
    pub fn set_server(&mut self, node: NodeId, t: f64, mut event: Event) {
        event.time = t;
        self.server.insert(node, event);
    }

    /// The operation currently in service at `node`.
    pub fn server(&self, node: NodeId) -> Option<&Event> {
        self.server.get(&node)
    }

    /// Empty the server slot of `node`.
    pub fn clear_server(&mut self, node: NodeId) {
        self.server.remove(&node);
    }

    pub fn link_len(&self) -> usize {
        self.link.len()
    }

    /// Whether both the link heap and every cache-service heap are empty.
    pub fn is_empty(&self) -> bool {
        self.link.is_empty() && self.cache.values().all(EventHeap::is_empty)
    }
}
