//! Error type shared by every stage of the harness.

use std::io;
use thiserror::Error;

use crate::measure::SweepPoint;

pub type Result<T> = std::result::Result<T, HarnessError>;

#[derive(Error, Debug)]
pub enum HarnessError {
    /// The program could not be started, exited non-zero, or timed out.
    #[error("execution failure: '{program}': {reason}")]
    ExecutionFailure { program: String, reason: String },

    /// A marker was missing from the output, or not followed by a duration.
    #[error("parse failure: no valid duration after marker {marker:?} in output {text:?}")]
    ParseFailure { marker: String, text: String },

    #[error("insufficient samples: got {count}, trimmed mean needs at least 3")]
    InsufficientSamples { count: usize },

    #[error("marker mismatch at {point}: {marker:?} is missing from one side of the comparison")]
    MarkerMismatch { marker: String, point: SweepPoint },

    #[error("division by zero at {point}: variant duration for {marker:?} is 0 or subnormal")]
    DivisionByZero { marker: String, point: SweepPoint },

    /// Context wrapper naming the program and sweep point a failure belongs to.
    #[error("'{program}' at {point}: {source}")]
    Sweep {
        program: String,
        point: SweepPoint,
        #[source]
        source: Box<HarnessError>,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl HarnessError {
    pub fn config<T: std::fmt::Display>(msg: T) -> Self {
        HarnessError::Config(msg.to_string())
    }

    pub fn execution<P: Into<String>, R: std::fmt::Display>(program: P, reason: R) -> Self {
        HarnessError::ExecutionFailure {
            program: program.into(),
            reason: reason.to_string(),
        }
    }

    /// Strip `Sweep` context layers and return the underlying failure.
    pub fn root(&self) -> &HarnessError {
        match self {
            HarnessError::Sweep { source, .. } => source.root(),
            other => other,
        }
    }
}
