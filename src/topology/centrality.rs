//! Betweenness centrality (Brandes), whole-graph and ego-network.
//!
//! Used by the CL4M strategy to pick the designated cache on a delivery
//! path. Hop-count shortest paths are used, matching the unweighted
//! centrality the strategy was defined with.

use std::collections::HashMap;

use super::Topology;
use crate::types::NodeId;

/// Normalised betweenness centrality of every node.
pub fn betweenness(topo: &Topology) -> HashMap<NodeId, f64> {
    let nodes: Vec<NodeId> = topo.nodes().collect();
    let index: HashMap<NodeId, usize> = nodes.iter().enumerate().map(|(i, &n)| (n, i)).collect();
    let adj: Vec<Vec<usize>> = nodes
        .iter()
        .map(|&n| topo.neighbors(n).map(|m| index[&m]).collect())
        .collect();
    let raw = brandes(&adj);
    let n = nodes.len() as f64;
    let scale = if n > 2.0 { 1.0 / ((n - 1.0) * (n - 2.0)) } else { 1.0 };
    nodes
        .iter()
        .zip(raw)
        .map(|(&node, value)| (node, value * scale))
        .collect()
}

/// Betweenness of each node within its own ego network (the node, its
/// neighbors, and every edge among them).
pub fn ego_betweenness(topo: &Topology) -> HashMap<NodeId, f64> {
    let mut out = HashMap::new();
    for center in topo.nodes() {
        let mut members: Vec<NodeId> = vec![center];
        members.extend(topo.neighbors(center));
        let index: HashMap<NodeId, usize> =
            members.iter().enumerate().map(|(i, &n)| (n, i)).collect();
        let adj: Vec<Vec<usize>> = members
            .iter()
            .map(|&n| {
                topo.neighbors(n)
                    .filter_map(|m| index.get(&m).copied())
                    .collect()
            })
            .collect();
        let raw = brandes(&adj);
        let n = members.len() as f64;
        let scale = if n > 2.0 { 1.0 / ((n - 1.0) * (n - 2.0)) } else { 1.0 };
        out.insert(center, raw[0] * scale);
    }
    out
}

/// Brandes' accumulation over unweighted shortest paths.
///
/// Returns the raw (directed-pair) sums; callers apply normalisation.
fn brandes(adj: &[Vec<usize>]) -> Vec<f64> {
    let n = adj.len();
    let mut centrality = vec![0.0; n];
    for s in 0..n {
        // BFS from s, counting shortest paths.
        let mut stack = Vec::with_capacity(n);
        let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut sigma = vec![0.0_f64; n];
        let mut dist = vec![-1_i64; n];
        sigma[s] = 1.0;
        dist[s] = 0;
        let mut queue = std::collections::VecDeque::new();
        queue.push_back(s);
        while let Some(v) = queue.pop_front() {
            stack.push(v);
            for &w in &adj[v] {
                if dist[w] < 0 {
                    dist[w] = dist[v] + 1;
                    queue.push_back(w);
                }
                if dist[w] == dist[v] + 1 {
                    sigma[w] += sigma[v];
                    preds[w].push(v);
                }
            }
        }
        // Back-propagate dependencies.
        let mut delta = vec![0.0_f64; n];
        while let Some(w) = stack.pop() {
            for &v in &preds[w] {
                delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
            }
            if w != s {
                centrality[w] += delta[w];
            }
        }
    }
    centrality
}
