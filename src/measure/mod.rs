//! # Measurement Pipeline
//!
//! Turns repeated runs of an external program into per-marker timings:
//!
//! `invoke → extract → reduce → compare`
//!
//! - [`trial`]: spawn one program run and capture its stdout
//! - [`extract`]: pull one duration per marker out of that text
//! - [`reduce`]: trimmed mean over the trials of one sweep point
//! - [`sweep`]: drive trials across the configured sweep points
//! - [`speedup`]: baseline / variant ratios as percentages

pub mod extract;
pub mod reduce;
pub mod speedup;
pub mod sweep;
pub mod test;
pub mod trial;

pub use extract::{Marker, TimeExtractor};
pub use reduce::trimmed_mean;
pub use speedup::{compute_speedups, SpeedupTable};
pub use sweep::{Launcher, PointOutcome, ProgramSpec, SampleSet, Sweep, SweepAggregator};
pub use trial::{Invocation, ProcessRunner, TrialRunner};

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Per-marker trimmed-mean durations, in seconds.
pub type Aggregate = MarkerMap<f64>;

/// Insertion-ordered map keyed by marker label.
///
/// Marker lists are short (a handful of phases), so lookups are linear.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerMap<T> {
    entries: Vec<(String, T)>,
}

impl<T> MarkerMap<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Insert or replace the value for `marker`, keeping its original position.
    pub fn insert(&mut self, marker: impl Into<String>, value: T) {
        let marker = marker.into();
        match self.entries.iter_mut().find(|(m, _)| *m == marker) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((marker, value)),
        }
    }

    pub fn get(&self, marker: &str) -> Option<&T> {
        self.entries.iter().find(|(m, _)| m == marker).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, marker: &str) -> Option<&mut T> {
        self.entries
            .iter_mut()
            .find(|(m, _)| m == marker)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, marker: &str) -> bool {
        self.get(marker).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(m, v)| (m.as_str(), v))
    }

    pub fn markers(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(m, _)| m.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|(_, v)| v)
    }
}

impl<T> Default for MarkerMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, K: Into<String>> FromIterator<(K, T)> for MarkerMap<T> {
    fn from_iter<I: IntoIterator<Item = (K, T)>>(iter: I) -> Self {
        let mut map = MarkerMap::new();
        for (marker, value) in iter {
            map.insert(marker, value);
        }
        map
    }
}

impl<T: Serialize> Serialize for MarkerMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (marker, value) in &self.entries {
            map.serialize_entry(marker, value)?;
        }
        map.end()
    }
}

/// Whether a run stays on one machine or is spread over a host file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostMode {
    #[default]
    Single,
    Multi,
}

impl HostMode {
    pub fn as_str(self) -> &'static str {
        match self {
            HostMode::Single => "single",
            HostMode::Multi => "multi",
        }
    }
}

/// The independent variables a batch of trials runs under.
///
/// The all-`None`, single-host point is the baseline (no sweep dimension).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepPoint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cores: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    pub hosts: HostMode,
}

impl SweepPoint {
    pub fn baseline() -> Self {
        Self::default()
    }

    pub fn threads(threads: usize) -> Self {
        Self {
            threads: Some(threads),
            ..Self::default()
        }
    }

    pub fn cores(cores: usize, hosts: HostMode) -> Self {
        Self {
            cores: Some(cores),
            hosts,
            ..Self::default()
        }
    }

    pub fn is_baseline(&self) -> bool {
        *self == Self::baseline()
    }
}

impl fmt::Display for SweepPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::with_capacity(4);
        if let Some(size) = self.size {
            parts.push(format!("size={size}"));
        }
        if let Some(cores) = self.cores {
            parts.push(format!("cores={cores}"));
        }
        if let Some(threads) = self.threads {
            parts.push(format!("threads={threads}"));
        }
        if self.hosts == HostMode::Multi {
            parts.push("multi-host".to_string());
        }

        if parts.is_empty() {
            write!(f, "baseline")
        } else {
            write!(f, "{}", parts.join(" "))
        }
    }
}
