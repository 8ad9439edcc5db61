//! Statistics Computation
//!
//! Reduces every (configuration, subject, operation) cell to its trimmed
//! mean plus descriptive statistics. Cells are independent, so the pass is
//! parallelized with Rayon. Keys never mix: each cell is reduced from its
//! own samples only.

use super::execution::SampleSet;
use rayon::prelude::*;
use std::collections::BTreeMap;
use sweepbench_core::Configuration;
use sweepbench_report::{CellStatistic, ConfigurationResult};
use sweepbench_stats::compute_summary;
use tracing::{debug, warn};

/// Coefficient of variation (percent) above which a cell is logged as noisy
const NOISY_CV_PCT: f64 = 20.0;

/// Aggregate all cells of the completed configurations
///
/// Every completed configuration gets an entry, even one whose trials all
/// failed, so the configuration axis stays intact. The result is sorted by
/// configuration.
pub fn compute_statistics(
    samples: &SampleSet,
    completed: &[Configuration],
    drop: usize,
) -> Vec<ConfigurationResult> {
    let cells: Vec<_> = samples
        .iter()
        .collect::<Vec<_>>()
        .par_iter()
        .filter_map(|((configuration, subject, operation), values)| {
            match CellStatistic::from_samples(values, drop) {
                Ok(cell) => {
                    let summary = compute_summary(values);
                    if !summary.is_stable(NOISY_CV_PCT) {
                        debug!(
                            %configuration,
                            subject = %subject,
                            %operation,
                            cv = summary.coefficient_of_variation(),
                            "noisy cell"
                        );
                    }
                    Some((*configuration, subject.clone(), operation.clone(), cell))
                }
                Err(e) => {
                    warn!(%configuration, subject = %subject, %operation, "skipping cell: {}", e);
                    None
                }
            }
        })
        .collect();

    let mut by_config: BTreeMap<Configuration, ConfigurationResult> = completed
        .iter()
        .map(|&c| (c, ConfigurationResult::new(c)))
        .collect();
    for (configuration, subject, operation, cell) in cells {
        by_config
            .entry(configuration)
            .or_insert_with(|| ConfigurationResult::new(configuration))
            .insert(&subject, operation, cell);
    }
    by_config.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sweepbench_core::TrialSample;

    fn sample(config: i64, subject: &str, secs: f64) -> TrialSample {
        TrialSample {
            configuration: Configuration(config),
            subject: subject.to_string(),
            operation: "total".into(),
            elapsed_secs: secs,
        }
    }

    #[test]
    fn test_cells_sorted_and_trimmed() {
        let mut set = SampleSet::default();
        for secs in [1.0, 2.0, 3.0, 100.0] {
            set.push(sample(100, "base", secs));
        }
        set.push(sample(10, "base", 0.5));
        set.push(sample(10, "variant", 0.7));

        let results = compute_statistics(
            &set,
            &[Configuration(10), Configuration(100)],
            1,
        );
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].configuration, Configuration(10));
        let cell = results[1].cell("base", "total").unwrap();
        assert!((cell.value - 2.5).abs() < 1e-12);
        // Single sample: 2*drop >= len falls back to the plain mean
        let single = results[0].cell("variant", "total").unwrap();
        assert!((single.value - 0.7).abs() < 1e-12);
        assert!(!single.trimmed);
    }

    #[test]
    fn test_configuration_without_cells_kept() {
        let results = compute_statistics(&SampleSet::default(), &[Configuration(1)], 0);
        assert_eq!(results.len(), 1);
        assert!(results[0].subjects.is_empty());
    }
}
