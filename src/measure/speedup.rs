//! Speedup of a variant over the sequential baseline.
//!
//! `speedup% = baseline[marker] / variant[marker] * 100`

use serde::Serialize;

use super::{Aggregate, MarkerMap, SweepPoint};
use crate::error::{HarnessError, Result};

/// One row of speedup percentages for a single sweep point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeedupRow {
    pub point: SweepPoint,
    pub speedups: MarkerMap<f64>,
}

/// Speedup percentages in sweep order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SpeedupTable {
    rows: Vec<SpeedupRow>,
}

impl SpeedupTable {
    pub fn rows(&self) -> &[SpeedupRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, point: &SweepPoint) -> Option<&MarkerMap<f64>> {
        self.rows
            .iter()
            .find(|r| r.point == *point)
            .map(|r| &r.speedups)
    }
}

/// Compare every variant aggregate against the baseline.
///
/// Both sides must report exactly the same markers; a marker seen on one
/// side only is a [`HarnessError::MarkerMismatch`], and a zero variant
/// duration is a [`HarnessError::DivisionByZero`].
pub fn compute_speedups(
    baseline: &Aggregate,
    variant: &[(SweepPoint, Aggregate)],
) -> Result<SpeedupTable> {
    let mut rows = Vec::with_capacity(variant.len());

    for (point, aggregate) in variant {
        let mismatch = |marker: &str| HarnessError::MarkerMismatch {
            marker: marker.to_string(),
            point: point.clone(),
        };

        if let Some(marker) = baseline.markers().find(|m| !aggregate.contains(m)) {
            return Err(mismatch(marker));
        }

        let mut speedups = MarkerMap::with_capacity(aggregate.len());
        for (marker, &variant_time) in aggregate.iter() {
            let base_time = *baseline.get(marker).ok_or_else(|| mismatch(marker))?;
            let pct = base_time / variant_time * 100.0;
            // A subnormal duration overflows the ratio just like an exact zero.
            if variant_time == 0.0 || !pct.is_finite() {
                return Err(HarnessError::DivisionByZero {
                    marker: marker.to_string(),
                    point: point.clone(),
                });
            }
            speedups.insert(marker, pct);
        }

        rows.push(SpeedupRow {
            point: point.clone(),
            speedups,
        });
    }

    Ok(SpeedupTable { rows })
}
