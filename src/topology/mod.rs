//! Network topologies and their immutable projections.
//!
//! A [`Topology`] is an undirected graph of receivers, routers and
//! sources with per-edge delay and type. At construction it precomputes
//! the projections the engine reads on every event: symmetrised
//! all-pairs shortest paths, per-direction link delays and types, and
//! the node partition. The graph itself never changes during a run.

mod centrality;
mod placement;

pub use centrality::{betweenness, ego_betweenness};
pub use placement::{uniform_cache_placement, uniform_content_placement};

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use ordered_float::OrderedFloat;
use petgraph::graph::{NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::types::NodeId;

/// Role of a node in the content network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Issues requests; never caches.
    Receiver,
    /// Forwards packets; may hold a cache after placement.
    Router,
    /// Permanently stores a set of contents.
    Source,
}

/// Whether a link is inside the operator's network or crosses its edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkType {
    Internal,
    External,
}

/// Per-edge attributes.
#[derive(Debug, Clone, Copy)]
pub struct Link {
    pub delay: f64,
    pub link_type: LinkType,
}

/// A fixed network of receivers, routers and sources.
#[derive(Debug)]
pub struct Topology {
    graph: UnGraph<NodeKind, Link>,
    receivers: Vec<NodeId>,
    routers: Vec<NodeId>,
    sources: Vec<NodeId>,
    paths: HashMap<(NodeId, NodeId), Vec<NodeId>>,
    delays: HashMap<(NodeId, NodeId), f64>,
    link_types: HashMap<(NodeId, NodeId), LinkType>,
    cache_assignment: Option<HashMap<NodeId, NodeId>>,
}

impl Topology {
    /// A line of `n` nodes with uniform link `delay`: node 0 is the
    /// receiver, node `n - 1` the source, everything in between a router.
    pub fn path(n: usize, delay: f64) -> Result<Self> {
        if n < 3 {
            return Err(SimError::Topology(format!(
                "PATH topology needs at least 3 nodes, got {n}"
            )));
        }
        let mut graph = UnGraph::new_undirected();
        let nodes: Vec<NodeIndex> = (0..n)
            .map(|i| {
                graph.add_node(if i == 0 {
                    NodeKind::Receiver
                } else if i == n - 1 {
                    NodeKind::Source
                } else {
                    NodeKind::Router
                })
            })
            .collect();
        for pair in nodes.windows(2) {
            graph.add_edge(
                pair[0],
                pair[1],
                Link {
                    delay,
                    link_type: LinkType::Internal,
                },
            );
        }
        Self::from_graph(graph)
    }

    /// A perfect `k`-ary tree of depth `h` with uniform link `delay`:
    /// the root is the source, leaves are receivers, interior nodes are
    /// routers.
    pub fn tree(k: usize, h: usize, delay: f64) -> Result<Self> {
        if k < 2 {
            return Err(SimError::Topology(format!(
                "TREE topology needs branching factor >= 2, got {k}"
            )));
        }
        if h < 2 {
            return Err(SimError::Topology(format!(
                "TREE topology needs depth >= 2 (a depth-1 tree has no routers), got {h}"
            )));
        }
        let mut graph = UnGraph::new_undirected();
        let root = graph.add_node(NodeKind::Source);
        let mut frontier = vec![root];
        for depth in 1..=h {
            let kind = if depth == h {
                NodeKind::Receiver
            } else {
                NodeKind::Router
            };
            let mut next = Vec::with_capacity(frontier.len() * k);
            for &parent in &frontier {
                for _ in 0..k {
                    let child = graph.add_node(kind);
                    graph.add_edge(
                        parent,
                        child,
                        Link {
                            delay,
                            link_type: LinkType::Internal,
                        },
                    );
                    next.push(child);
                }
            }
            frontier = next;
        }
        Self::from_graph(graph)
    }

    /// Build a topology from an already-assembled graph, computing every
    /// projection and validating receiver/source connectivity.
    pub fn from_graph(graph: UnGraph<NodeKind, Link>) -> Result<Self> {
        let mut receivers = Vec::new();
        let mut routers = Vec::new();
        let mut sources = Vec::new();
        for idx in graph.node_indices() {
            let id = NodeId(idx.index() as u32);
            match graph[idx] {
                NodeKind::Receiver => receivers.push(id),
                NodeKind::Router => routers.push(id),
                NodeKind::Source => sources.push(id),
            }
        }
        if receivers.is_empty() {
            return Err(SimError::Topology("topology has no receivers".into()));
        }
        if sources.is_empty() {
            return Err(SimError::Topology("topology has no sources".into()));
        }

        let mut delays = HashMap::new();
        let mut link_types = HashMap::new();
        for edge in graph.edge_indices() {
            let (a, b) = graph
                .edge_endpoints(edge)
                .ok_or_else(|| SimError::Topology("dangling edge".into()))?;
            let link = graph[edge];
            let (u, v) = (NodeId(a.index() as u32), NodeId(b.index() as u32));
            delays.insert((u, v), link.delay);
            delays.insert((v, u), link.delay);
            link_types.insert((u, v), link.link_type);
            link_types.insert((v, u), link.link_type);
        }

        let paths = all_pairs_shortest_paths(&graph);

        let topo = Self {
            graph,
            receivers,
            routers,
            sources,
            paths,
            delays,
            link_types,
            cache_assignment: None,
        };

        for &r in &topo.receivers {
            for &s in &topo.sources {
                if topo.shortest_path(r, s).is_none() {
                    return Err(SimError::Topology(format!(
                        "receiver {r} and source {s} are disconnected"
                    )));
                }
            }
        }
        Ok(topo)
    }

    pub fn receivers(&self) -> &[NodeId] {
        &self.receivers
    }

    pub fn routers(&self) -> &[NodeId] {
        &self.routers
    }

    pub fn sources(&self) -> &[NodeId] {
        &self.sources
    }

    /// All node ids, in index order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph
            .node_indices()
            .map(|idx| NodeId(idx.index() as u32))
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.graph
            .node_weight(NodeIndex::new(node.0 as usize))
            .copied()
    }

    pub fn degree(&self, node: NodeId) -> usize {
        self.graph.neighbors(NodeIndex::new(node.0 as usize)).count()
    }

    pub fn neighbors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.graph
            .neighbors(NodeIndex::new(node.0 as usize))
            .map(|idx| NodeId(idx.index() as u32))
    }

    /// Shortest path from `s` to `t` inclusive of both endpoints.
    ///
    /// Paths are symmetric: `path(u, v) == reverse(path(v, u))`.
    pub fn shortest_path(&self, s: NodeId, t: NodeId) -> Option<&[NodeId]> {
        self.paths.get(&(s, t)).map(Vec::as_slice)
    }

    /// Number of hops on the shortest path from `s` to `t`.
    pub fn path_hops(&self, s: NodeId, t: NodeId) -> Option<usize> {
        self.shortest_path(s, t).map(|p| p.len().saturating_sub(1))
    }

    pub fn link_delay(&self, u: NodeId, v: NodeId) -> Option<f64> {
        self.delays.get(&(u, v)).copied()
    }

    pub fn link_type(&self, u: NodeId, v: NodeId) -> Option<LinkType> {
        self.link_types.get(&(u, v)).copied()
    }

    /// Per-direction link delays, for collectors that account latency.
    pub fn link_delays(&self) -> &HashMap<(NodeId, NodeId), f64> {
        &self.delays
    }

    /// Per-direction link types, for collectors that attribute load.
    pub fn link_types(&self) -> &HashMap<(NodeId, NodeId), LinkType> {
        &self.link_types
    }

    /// Static receiver → cache-node mapping, when the scenario defines one.
    pub fn cache_assignment(&self) -> Option<&HashMap<NodeId, NodeId>> {
        self.cache_assignment.as_ref()
    }

    /// Install a receiver → cache-node mapping (used by PARTITION).
    pub fn set_cache_assignment(&mut self, assignment: HashMap<NodeId, NodeId>) {
        self.cache_assignment = Some(assignment);
    }
}

/// Consecutive `(u, v)` hops of a path.
pub fn path_links(path: &[NodeId]) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
    path.windows(2).map(|w| (w[0], w[1]))
}

/// Dijkstra from every node, then symmetrised so that
/// `path(u, v) == reverse(path(v, u))`.
fn all_pairs_shortest_paths(
    graph: &UnGraph<NodeKind, Link>,
) -> HashMap<(NodeId, NodeId), Vec<NodeId>> {
    let mut paths = HashMap::new();
    for s in graph.node_indices() {
        single_source_paths(graph, s, &mut paths);
    }
    // Overwrite the upper triangle with reversed lower-triangle paths so
    // both directions traverse the same nodes even when multiple shortest
    // paths exist.
    let keys: Vec<(NodeId, NodeId)> = paths.keys().copied().collect();
    for (u, v) in keys {
        if u < v {
            if let Some(forward) = paths.get(&(u, v)) {
                let mut reversed = forward.clone();
                reversed.reverse();
                paths.insert((v, u), reversed);
            }
        }
    }
    paths
}

fn single_source_paths(
    graph: &UnGraph<NodeKind, Link>,
    s: NodeIndex,
    paths: &mut HashMap<(NodeId, NodeId), Vec<NodeId>>,
) {
    let mut dist: HashMap<NodeIndex, f64> = HashMap::new();
    let mut prev: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    let mut heap = BinaryHeap::new();
    dist.insert(s, 0.0);
    heap.push(Reverse((OrderedFloat(0.0), s.index())));

    while let Some(Reverse((OrderedFloat(d), idx))) = heap.pop() {
        let u = NodeIndex::new(idx);
        if dist.get(&u).is_some_and(|&best| d > best) {
            continue;
        }
        for v in graph.neighbors(u) {
            let Some(edge) = graph.find_edge(u, v) else {
                continue;
            };
            let next = d + graph[edge].delay;
            if dist.get(&v).is_none_or(|&best| next < best) {
                dist.insert(v, next);
                prev.insert(v, u);
                heap.push(Reverse((OrderedFloat(next), v.index())));
            }
        }
    }

    let sid = NodeId(s.index() as u32);
    for t in graph.node_indices() {
        if !dist.contains_key(&t) {
            continue;
        }
        let mut path = Vec::new();
        let mut cur = t;
        path.push(NodeId(cur.index() as u32));
        while cur != s {
            let Some(&p) = prev.get(&cur) else {
                break;
            };
            cur = p;
            path.push(NodeId(cur.index() as u32));
        }
        path.reverse();
        paths.insert((sid, NodeId(t.index() as u32)), path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_topology_partitions_nodes() {
        let topo = Topology::path(5, 2.0).unwrap();
        assert_eq!(topo.receivers(), &[NodeId(0)]);
        assert_eq!(topo.sources(), &[NodeId(4)]);
        assert_eq!(topo.routers(), &[NodeId(1), NodeId(2), NodeId(3)]);
    }

    #[test]
    fn path_topology_rejects_degenerate_sizes() {
        assert!(Topology::path(2, 1.0).is_err());
    }

    #[test]
    fn shortest_paths_are_symmetric() {
        let topo = Topology::tree(2, 3, 1.0).unwrap();
        for u in topo.nodes() {
            for v in topo.nodes() {
                let forward = topo.shortest_path(u, v).unwrap().to_vec();
                let mut backward = topo.shortest_path(v, u).unwrap().to_vec();
                backward.reverse();
                assert_eq!(forward, backward, "asymmetric path {u} -> {v}");
            }
        }
    }

    #[test]
    fn path_shortest_path_is_the_line() {
        let topo = Topology::path(4, 3.0).unwrap();
        let path = topo.shortest_path(NodeId(0), NodeId(3)).unwrap();
        assert_eq!(path, &[NodeId(0), NodeId(1), NodeId(2), NodeId(3)]);
        assert_eq!(topo.link_delay(NodeId(1), NodeId(2)), Some(3.0));
        assert_eq!(topo.link_delay(NodeId(2), NodeId(1)), Some(3.0));
        assert_eq!(topo.path_hops(NodeId(0), NodeId(3)), Some(3));
    }

    #[test]
    fn tree_topology_shape() {
        let topo = Topology::tree(2, 3, 1.0).unwrap();
        // 1 + 2 + 4 + 8 nodes
        assert_eq!(topo.node_count(), 15);
        assert_eq!(topo.sources().len(), 1);
        assert_eq!(topo.receivers().len(), 8);
        assert_eq!(topo.routers().len(), 6);
        // Every receiver reaches the root in h hops.
        for &r in topo.receivers() {
            assert_eq!(topo.path_hops(r, topo.sources()[0]), Some(3));
        }
    }

    #[test]
    fn trivial_self_path() {
        let topo = Topology::path(3, 1.0).unwrap();
        assert_eq!(
            topo.shortest_path(NodeId(1), NodeId(1)).unwrap(),
            &[NodeId(1)]
        );
    }

    #[test]
    fn from_graph_rejects_disconnected_pairs() {
        let mut graph = UnGraph::new_undirected();
        graph.add_node(NodeKind::Receiver);
        graph.add_node(NodeKind::Source);
        // no edge between them
        let err = Topology::from_graph(graph).unwrap_err();
        assert!(err.to_string().contains("disconnected"));
    }
}
