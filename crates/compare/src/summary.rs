use std::collections::BTreeMap;

use serde::Serialize;

use crate::value::CompareOutcome;

/// Counts for one comparison run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ComparisonSummary {
    /// Entries examined, passing ones included.
    pub compared: usize,
    pub failures: usize,
    pub missing: usize,
    pub surplus: usize,
    /// Per-outcome counts, keyed by `CompareOutcome::as_str`.
    pub outcome_counts: BTreeMap<String, usize>,
}

impl ComparisonSummary {
    pub fn passed(&self) -> usize {
        self.compared.saturating_sub(self.failures)
    }

    pub fn is_clean(&self) -> bool {
        self.failures == 0
    }
}

/// Compute summary statistics from the outcomes of the materialized failures.
pub fn compute_summary<I>(compared: usize, outcomes: I) -> ComparisonSummary
where
    I: IntoIterator<Item = CompareOutcome>,
{
    let mut summary = ComparisonSummary {
        compared,
        ..ComparisonSummary::default()
    };

    for outcome in outcomes {
        *summary.outcome_counts.entry(outcome.to_string()).or_insert(0) += 1;
        if outcome.is_ok() {
            continue;
        }
        summary.failures += 1;
        match outcome {
            CompareOutcome::Missing => summary.missing += 1,
            CompareOutcome::Surplus => summary.surplus += 1,
            _ => {}
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_by_outcome() {
        let summary = compute_summary(
            10,
            [
                CompareOutcome::Missing,
                CompareOutcome::Surplus,
                CompareOutcome::Surplus,
                CompareOutcome::OutsideToleranceIssue,
            ],
        );
        assert_eq!(summary.compared, 10);
        assert_eq!(summary.failures, 4);
        assert_eq!(summary.passed(), 6);
        assert_eq!(summary.missing, 1);
        assert_eq!(summary.surplus, 2);
        assert_eq!(summary.outcome_counts.get("surplus"), Some(&2));
        assert_eq!(summary.outcome_counts.get("outside_tolerance"), Some(&1));
        assert!(!summary.is_clean());
    }

    #[test]
    fn empty_run_is_clean() {
        let summary = compute_summary(0, []);
        assert!(summary.is_clean());
        assert!(summary.outcome_counts.is_empty());
    }
}
