//! Trimmed-mean reduction of per-trial samples.

use crate::error::{HarnessError, Result};

/// Smallest sample count that still leaves one value after trimming.
pub const MIN_SAMPLES: usize = 3;

/// Drop one maximum and one minimum, then average what is left.
///
/// Ties are not deduplicated: `[7.0, 7.0, 7.0]` removes two of the three
/// sevens. The samples are sorted before summing so that any permutation
/// of the same multiset yields a bit-identical mean.
pub fn trimmed_mean(samples: &[f64]) -> Result<f64> {
    if samples.len() < MIN_SAMPLES {
        return Err(HarnessError::InsufficientSamples {
            count: samples.len(),
        });
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);

    let kept = &sorted[1..sorted.len() - 1];
    Ok(kept.iter().sum::<f64>() / kept.len() as f64)
}
