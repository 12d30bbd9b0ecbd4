use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use mf_results::{
    RunIdInputs, RunManifest, RunStore, SimulationSummary, SummaryStatistics, compute_run_id,
};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    dir.push(format!("{}_{}", prefix, nanos));
    dir
}

#[test]
fn save_list_load_roundtrip() {
    let root = unique_temp_dir("mf_results_store");
    let store = RunStore::new(root.clone()).expect("failed to create run store");

    let run_id = compute_run_id(&RunIdInputs {
        model: "demo",
        seed: 1,
        runs: 4,
        periods: 2,
        engine_version: "0.1.0",
    });

    let manifest = RunManifest {
        run_id: run_id.clone(),
        model: "demo".to_string(),
        seed: 1,
        runs: 4,
        periods: 2,
        timestamp: "2026-08-07T00:00:00Z".to_string(),
        engine_version: "0.1.0".to_string(),
    };

    let mut record = mf_core::RunPeriodMatrix::zeros(4, 2);
    for run in 0..4 {
        record.set(run, 0, run as f64);
    }
    let summary = SimulationSummary {
        inventories: vec![mf_results::InventorySummary {
            compartment: "landfill".to_string(),
            stats: SummaryStatistics::from_record(&record, true, &[10.0, 90.0]),
        }],
        ..SimulationSummary::default()
    };

    assert!(!store.has_run(&run_id));
    store
        .save_run(&manifest, &summary)
        .expect("failed to save run");
    assert!(store.has_run(&run_id));

    let runs = store.list_runs("demo").expect("failed to list runs");
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].run_id, run_id);

    let loaded_manifest = store
        .load_manifest(&run_id)
        .expect("failed to load manifest");
    assert_eq!(loaded_manifest.model, "demo");
    assert_eq!(loaded_manifest.seed, 1);

    let loaded_summary = store.load_summary(&run_id).expect("failed to load summary");
    assert_eq!(loaded_summary.inventories.len(), 1);
    assert_eq!(
        loaded_summary.inventories[0].stats.mean,
        summary.inventories[0].stats.mean
    );

    store.delete_run(&run_id).expect("failed to delete run");
    assert!(!store.has_run(&run_id));

    fs::remove_dir_all(root).ok();
}

#[test]
fn loading_a_missing_run_fails() {
    let root = unique_temp_dir("mf_results_missing");
    let store = RunStore::new(root.clone()).expect("failed to create run store");
    assert!(store.load_manifest("nope").is_err());
    assert!(store.load_summary("nope").is_err());
    fs::remove_dir_all(root).ok();
}
