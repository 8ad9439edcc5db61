//! Compare collection strategies across growing input sizes.
//!
//! Run with `cargo run --example collections -p sweepbench`.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use sweepbench::prelude::*;
use sweepbench::write_report_files;

fn main() -> anyhow::Result<()> {
    let mut config = SweepConfig::default();
    config.sweep = SweepSpec::exponential(2, 5, 1);
    config.runner.repetitions = 7;
    config.runner.drop = 1;
    config.runner.operations = vec!["insert".into(), "lookup".into(), "total".into()];
    config.analysis.baseline = Some("vec".into());
    config.analysis.best_of = vec!["hashmap".into(), "btreemap".into()];

    let subjects: Vec<Arc<dyn Subject>> = vec![
        Arc::new(FnSubject::new("vec", |scope| {
            let n = scope.size() as u64;
            let v: Vec<u64> = scope.measure("insert", || (0..n).collect());
            scope.measure("lookup", || (0..n).step_by(97).filter(|k| v.binary_search(k).is_ok()).count());
            Ok(())
        })),
        Arc::new(FnSubject::new("hashmap", |scope| {
            let n = scope.size() as u64;
            let m: HashMap<u64, u64> = scope.measure("insert", || (0..n).map(|k| (k, k)).collect());
            scope.measure("lookup", || (0..n).step_by(97).filter(|k| m.contains_key(k)).count());
            Ok(())
        })),
        Arc::new(FnSubject::new("btreemap", |scope| {
            let n = scope.size() as u64;
            let m: BTreeMap<u64, u64> = scope.measure("insert", || (0..n).map(|k| (k, k)).collect());
            scope.measure("lookup", || (0..n).step_by(97).filter(|k| m.contains_key(k)).count());
            Ok(())
        })),
    ];

    let report = run_sweep(&config, subjects, &CancellationToken::new())?;
    print!("{}", format_human_output(&report));
    write_report_files(&report, std::path::Path::new("target/sweepbench/collections"), true)?;
    Ok(())
}
