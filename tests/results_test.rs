//! Result set persistence and CSV projection.

use icnsim::results::ResultSet;
use icnsim::tree::Tree;

fn sample_set() -> ResultSet {
    let mut set = ResultSet::new();
    for (strategy, ratio, latency) in [
        ("LCE_PKT_LEVEL", 0.25, 8.0),
        ("LCD_PKT_LEVEL", 0.31, 7.5),
    ] {
        let mut params = Tree::new();
        params.set("strategy.name", strategy);
        params.set("topology.name", "PATH");
        params.set("workload.n_contents", 100);
        let mut results = Tree::new();
        results.set("CACHE_HIT_RATIO.MEAN", ratio);
        results.set("LATENCY.MEAN", latency);
        set.push(params, results);
    }
    set
}

#[test]
fn write_then_read_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.json");

    let set = sample_set();
    set.write(&path).unwrap();
    let loaded = ResultSet::read(&path).unwrap();

    assert_eq!(loaded.len(), 2);
    let entries: Vec<_> = loaded.iter().collect();
    assert_eq!(
        entries[0].results.get_f64("CACHE_HIT_RATIO.MEAN"),
        Some(0.25)
    );
    assert_eq!(entries[1].params.get_str("strategy.name"), Some("LCD_PKT_LEVEL"));
}

#[test]
fn reading_a_missing_file_is_an_io_error() {
    let err = ResultSet::read(std::path::Path::new("/nonexistent/results.json")).unwrap_err();
    assert!(matches!(err, icnsim::SimError::Io(_)));
}

#[test]
fn csv_summaries_have_one_row_per_experiment() {
    let dir = tempfile::tempdir().unwrap();
    let set = sample_set();
    let files = set.write_csv_summaries(dir.path()).unwrap();

    // One file per metric path.
    assert_eq!(files.len(), 2);
    let hit_file = files
        .iter()
        .find(|f| f.file_name().unwrap() == "CACHE_HIT_RATIO_MEAN.csv")
        .unwrap();
    let content = std::fs::read_to_string(hit_file).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[0], "experiment,value");
    assert_eq!(lines[1], "LCE_PKT_LEVEL/PATH,0.25");
    assert_eq!(lines[2], "LCD_PKT_LEVEL/PATH,0.31");
}

#[test]
fn empty_set_writes_no_summaries() {
    let dir = tempfile::tempdir().unwrap();
    let files = ResultSet::new().write_csv_summaries(dir.path()).unwrap();
    assert!(files.is_empty());
}
