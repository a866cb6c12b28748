//! Result persistence and summaries.
//!
//! A run produces one [`ResultSet`]: an ordered list of
//! `(experiment parameters, collector results)` pairs, serialised to a
//! single JSON file. The `plot` subcommand projects a result set into
//! one CSV per metric, with one row per experiment — the plot-ready
//! form of the data.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::{Result, SimError};
use crate::tree::Tree;

/// One experiment's outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultEntry {
    pub params: Tree,
    pub results: Tree,
}

impl ResultEntry {
    /// A short human-readable label: the configured description, or the
    /// strategy/topology pair.
    pub fn label(&self) -> String {
        if let Some(desc) = self.params.get_str("desc") {
            return desc.to_string();
        }
        let strategy = self.params.get_str("strategy.name").unwrap_or("?");
        let topology = self.params.get_str("topology.name").unwrap_or("?");
        format!("{strategy}/{topology}")
    }
}

/// The persisted outcome of a whole configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultSet {
    entries: Vec<ResultEntry>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, params: Tree, results: Tree) {
        self.entries.push(ResultEntry { params, results });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResultEntry> {
        self.entries.iter()
    }

    /// Persist to `path` as pretty-printed JSON.
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .map_err(|e| SimError::Io(format!("failed to write results {path:?}: {e}")))?;
        info!(?path, entries = self.len(), "results written");
        Ok(())
    }

    /// Load a previously written result set.
    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| SimError::Io(format!("failed to read results {path:?}: {e}")))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write one CSV per metric into `outdir`, one row per experiment.
    ///
    /// Returns the files written.
    pub fn write_csv_summaries(&self, outdir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(outdir)
            .map_err(|e| SimError::Io(format!("failed to create {outdir:?}: {e}")))?;

        // Collect metric paths in first-seen order.
        let mut metrics: Vec<String> = Vec::new();
        for entry in &self.entries {
            for (path, _) in entry.results.flatten() {
                if !metrics.contains(&path) {
                    metrics.push(path);
                }
            }
        }

        let mut written = Vec::with_capacity(metrics.len());
        for metric in &metrics {
            let mut csv = String::from("experiment,value\n");
            for entry in &self.entries {
                let value = entry
                    .results
                    .get(metric)
                    .map(render_value)
                    .unwrap_or_default();
                csv.push_str(&format!("{},{}\n", escape_csv(&entry.label()), value));
            }
            let file = outdir.join(format!("{}.csv", metric.replace('.', "_")));
            fs::write(&file, csv)
                .map_err(|e| SimError::Io(format!("failed to write {file:?}: {e}")))?;
            written.push(file);
        }
        info!(?outdir, files = written.len(), "summaries written");
        Ok(written)
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn escape_csv(field: &str) -> String {
    if field.contains(',') || field.contains('"') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_set() -> ResultSet {
        let mut set = ResultSet::new();
        let mut params = Tree::new();
        params.set("strategy.name", "LCE_PKT_LEVEL");
        params.set("topology.name", "PATH");
        let mut results = Tree::new();
        results.set("CACHE_HIT_RATIO.MEAN", 0.25);
        results.set("LATENCY.MEAN", 8.0);
        set.push(params, results);
        set
    }

    #[test]
    fn label_falls_back_to_strategy_and_topology() {
        let set = sample_set();
        let entry = set.iter().next().unwrap();
        assert_eq!(entry.label(), "LCE_PKT_LEVEL/PATH");
    }

    #[test]
    fn label_prefers_the_description() {
        let mut params = Tree::new();
        params.set("desc", "baseline");
        let entry = ResultEntry {
            params,
            results: Tree::new(),
        };
        assert_eq!(entry.label(), "baseline");
    }

    #[test]
    fn csv_escapes_commas_and_quotes() {
        assert_eq!(escape_csv("plain"), "plain");
        assert_eq!(escape_csv("a,b"), "\"a,b\"");
        assert_eq!(escape_csv("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
