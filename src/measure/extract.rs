//! Marker → duration extraction from free-form program output.
//!
//! The output format is a flat list of labelled numbers, e.g.
//! `Final total time: 3.2 seconds` or `Total time: 3.2s`. For every marker
//! the first occurrence wins; spaces and tabs are skipped, the following
//! non-whitespace run is taken and any trailing punctuation or unit suffix
//! is stripped before parsing.

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::MarkerMap;
use crate::error::{HarnessError, Result};

/// A timing phase: the label results are keyed by, and the literal text
/// searched for in program output.
///
/// Usually both are the same. They differ when two programs print the same
/// phase differently (`Total time:` vs `Final total time:`) but their
/// results must still be compared marker by marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "MarkerRepr", into = "MarkerRepr")]
pub struct Marker {
    pub label: String,
    pub pattern: String,
}

impl Marker {
    pub fn aliased(label: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            pattern: pattern.into(),
        }
    }
}

impl From<&str> for Marker {
    fn from(marker: &str) -> Self {
        Self::aliased(marker, marker)
    }
}

impl From<String> for Marker {
    fn from(marker: String) -> Self {
        Self::aliased(marker.clone(), marker)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum MarkerRepr {
    Plain(String),
    Aliased { label: String, pattern: String },
}

impl From<MarkerRepr> for Marker {
    fn from(repr: MarkerRepr) -> Self {
        match repr {
            MarkerRepr::Plain(marker) => marker.into(),
            MarkerRepr::Aliased { label, pattern } => Marker::aliased(label, pattern),
        }
    }
}

impl From<Marker> for MarkerRepr {
    fn from(marker: Marker) -> Self {
        if marker.label == marker.pattern {
            MarkerRepr::Plain(marker.label)
        } else {
            MarkerRepr::Aliased {
                label: marker.label,
                pattern: marker.pattern,
            }
        }
    }
}

/// Compiled extractor for a fixed marker list.
#[derive(Debug, Clone)]
pub struct TimeExtractor {
    patterns: Vec<(String, Regex)>,
}

impl TimeExtractor {
    pub fn new<M: Clone + Into<Marker>>(markers: &[M]) -> Result<Self> {
        let patterns = markers
            .iter()
            .map(|m| {
                let marker: Marker = m.clone().into();
                // The duration must sit on the marker's own line
                let re = Regex::new(&format!(r"{}[ \t]*(\S*)", regex::escape(&marker.pattern)))?;
                Ok((marker.label, re))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn markers(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|(m, _)| m.as_str())
    }

    /// One sample per marker, in marker-list order.
    pub fn extract(&self, text: &str) -> Result<MarkerMap<f64>> {
        let mut samples = MarkerMap::with_capacity(self.patterns.len());
        for (marker, re) in &self.patterns {
            let token = re
                .captures(text)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str())
                .unwrap_or_default();
            let value = parse_duration(token).ok_or_else(|| HarnessError::ParseFailure {
                marker: marker.clone(),
                text: text.to_string(),
            })?;
            samples.insert(marker.as_str(), value);
        }
        Ok(samples)
    }
}

/// Parse a duration token, dropping trailing non-digit characters (`.`, `s`).
fn parse_duration(token: &str) -> Option<f64> {
    let trimmed = token.trim_end_matches(|c: char| !c.is_ascii_digit());
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}
