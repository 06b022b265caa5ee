use std::fmt;

use serde::{Serialize, Serializer};

use crate::RunSummary;

/// Relative change of a current value against its baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PercentChange {
    Increase(f64),
    Decrease(f64),
    Unchanged,
    /// The baseline is zero while the current value is not, or either value is not finite.
    NotApplicable,
}

impl PercentChange {
    pub fn between(current: f64, baseline: f64) -> Self {
        if baseline == 0.0 {
            return if current == 0.0 {
                PercentChange::Unchanged
            } else {
                PercentChange::NotApplicable
            };
        }

        let ratio = current / baseline;
        if !ratio.is_finite() {
            PercentChange::NotApplicable
        } else if ratio > 1.0 {
            PercentChange::Increase(100.0 * (ratio - 1.0))
        } else if ratio < 1.0 {
            PercentChange::Decrease(100.0 * (1.0 - ratio))
        } else {
            PercentChange::Unchanged
        }
    }
}

impl fmt::Display for PercentChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PercentChange::Increase(p) => write!(f, "+{p:.1} %"),
            PercentChange::Decrease(p) => write!(f, "-{p:.1} %"),
            PercentChange::Unchanged => write!(f, "0%"),
            PercentChange::NotApplicable => write!(f, "N/A"),
        }
    }
}

impl Serialize for PercentChange {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparedMetric {
    pub metric: String,
    pub current: f64,
    pub baseline: f64,
    pub change: PercentChange,
}

impl fmt::Display for ComparedMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: current:{:.1} baseline:{:.1} change:{}",
            self.metric, self.current, self.baseline, self.change
        )
    }
}

/// Metric by metric comparison of two summaries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    pub metrics: Vec<ComparedMetric>,
}

impl ComparisonReport {
    /// Pair up the metrics of both summaries by name.
    ///
    /// A metric missing from the baseline is compared against zero.
    pub fn new(current: &RunSummary, baseline: &RunSummary) -> Self {
        let baseline_metrics = baseline.metrics();

        let metrics = current
            .metrics()
            .into_iter()
            .map(|(metric, current)| {
                let baseline = baseline_metrics
                    .iter()
                    .find(|(name, _)| *name == metric)
                    .map(|(_, v)| *v)
                    .unwrap_or_default();

                ComparedMetric {
                    change: PercentChange::between(current, baseline),
                    metric,
                    current,
                    baseline,
                }
            })
            .collect();

        Self { metrics }
    }
}
