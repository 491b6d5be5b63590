//! Descriptive statistics over raw trial samples.
//!
//! These are reported next to the trimmed mean so that noisy sweep points
//! stand out; they never replace it.

use serde::Serialize;

use crate::measure::{MarkerMap, SampleSet};

/// Spread of the raw samples for one marker at one sweep point.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SampleStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    /// Sample standard deviation (n - 1)
    pub std_dev: f64,
    /// Coefficient of variation, std_dev / mean of all samples
    pub cv: f64,
}

impl SampleStats {
    /// `None` for an empty slice.
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let mean = sorted.iter().sum::<f64>() / count as f64;
        let std_dev = calculate_std_dev(&sorted, mean);

        Some(Self {
            count,
            min: sorted[0],
            max: sorted[count - 1],
            median: calculate_median(&sorted),
            std_dev,
            cv: if mean > 0.0 { std_dev / mean } else { 0.0 },
        })
    }
}

/// Stats for every marker of a sample set, skipping empty columns.
pub fn summarize(samples: &SampleSet) -> MarkerMap<SampleStats> {
    samples
        .iter()
        .filter_map(|(marker, values)| SampleStats::from_samples(values).map(|s| (marker, s)))
        .collect()
}

/// Sample standard deviation around `mean`.
pub fn calculate_std_dev(samples: &[f64], mean: f64) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }

    let variance = samples
        .iter()
        .map(|s| {
            let diff = s - mean;
            diff * diff
        })
        .sum::<f64>()
        / (samples.len() - 1) as f64;

    variance.sqrt()
}

/// Median of an already sorted slice; the mean of the middle pair for even lengths.
fn calculate_median(sorted: &[f64]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
