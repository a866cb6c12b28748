//! Nested map of dynamic values with dotted-path access.
//!
//! Experiment parameter sets and collector results are heterogeneous,
//! dynamically shaped maps (`strategy.name`, `CACHE_HIT_RATIO.MEAN`, ...).
//! [`Tree`] models them as autovivifying nested JSON objects addressed by
//! dotted paths, so no object identity or static schema is needed.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An autovivifying nested map addressed by dotted paths.
///
/// ```rust
/// # use icnsim::tree::Tree;
/// let mut t = Tree::new();
/// t.set("strategy.name", "LCE_PKT_LEVEL");
/// t.set("workload.rate", 1.0);
/// assert_eq!(t.get_str("strategy.name"), Some("LCE_PKT_LEVEL"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tree(Map<String, Value>);

impl Tree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from any serialisable value that maps to a JSON object.
    ///
    /// Non-object values produce an empty tree.
    pub fn from_serialize<T: Serialize>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(Value::Object(map)) => Tree(map),
            _ => Tree::new(),
        }
    }

    /// Set `path` to `value`, creating intermediate maps as needed.
    ///
    /// An intermediate segment holding a non-map value is replaced by a map.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) {
        let mut current = &mut self.0;
        let mut segments = path.split('.').peekable();
        while let Some(seg) = segments.next() {
            if segments.peek().is_none() {
                current.insert(seg.to_string(), value.into());
                return;
            }
            let entry = current
                .entry(seg.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            let Value::Object(map) = entry else {
                return;
            };
            current = map;
        }
    }

    /// Graft a whole subtree at `path`.
    pub fn set_tree(&mut self, path: &str, subtree: Tree) {
        self.set(path, Value::Object(subtree.0));
    }

    /// Look up the value at a dotted path.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current: &Value = &Value::Null;
        for (i, seg) in path.split('.').enumerate() {
            current = if i == 0 {
                self.0.get(seg)?
            } else {
                current.as_object()?.get(seg)?
            };
        }
        Some(current)
    }

    /// Look up a number at a dotted path.
    pub fn get_f64(&self, path: &str) -> Option<f64> {
        self.get(path)?.as_f64()
    }

    /// Look up a string at a dotted path.
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path)?.as_str()
    }

    /// Whether the tree holds no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Flatten into `(dotted path, leaf value)` pairs in map order.
    pub fn flatten(&self) -> Vec<(String, Value)> {
        let mut out = Vec::new();
        for (key, value) in &self.0 {
            flatten_into(key, value, &mut out);
        }
        out
    }

    /// Consume the tree into a raw JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

fn flatten_into(prefix: &str, value: &Value, out: &mut Vec<(String, Value)>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                flatten_into(&format!("{prefix}.{key}"), child, out);
            }
        }
        leaf => out.push((prefix.to_string(), leaf.clone())),
    }
}
