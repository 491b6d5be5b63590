//! Benchmark configuration.
//!
//! A run is described by one TOML file: the sequential baseline, any number
//! of parallel variants with their sweeps, the optional distributed
//! launcher, and where to write results.
//!
//! # Example
//!
//! ```toml
//! trials = 3
//! timeout_secs = 600
//!
//! [launcher]
//! command = "mpirun"
//! hostfile = "h2"
//! interface = "eno1"
//!
//! [baseline]
//! name = "seq"
//! program = "./sequence-translator"
//! args = ["../allChromosomes_pretty.fa", "../out.fa"]
//! markers = ["Reading time:", "Total time:"]
//!
//! [[variant]]
//! name = "opt12"
//! program = "sequence-translatorOPT"
//! args = ["../allChromosomes_pretty.fa", "../out.fa"]
//! markers = [
//!     { label = "Reading time:", pattern = "Final reading time:" },
//!     { label = "Total time:", pattern = "Final total time:" },
//! ]
//! sweep = { cores = [12], hosts = "multi" }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{HarnessError, Result};
use crate::measure::reduce::MIN_SAMPLES;
use crate::measure::{HostMode, Launcher, Marker, ProgramSpec, Sweep, SweepPoint};
use crate::utils::cpu;

pub const DEFAULT_TRIALS: usize = 3;
pub const DEFAULT_TIMEOUT_SECS: u64 = 3600;
pub const DEFAULT_THREAD_ENV: &str = "OMP_NUM_THREADS";

/// Top-level benchmark description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchConfig {
    /// Trials per sweep point unless a program overrides it
    #[serde(default = "default_trials")]
    pub trials: usize,

    /// Per-trial timeout in seconds, 0 disables it
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Environment variable carrying the thread count to the child
    #[serde(default = "default_thread_env")]
    pub thread_env: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launcher: Option<Launcher>,

    pub baseline: ProgramConfig,

    #[serde(default, rename = "variant", skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<ProgramConfig>,

    #[serde(default)]
    pub output: OutputConfig,
}

/// One executable under test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramConfig {
    pub name: String,
    pub program: String,

    /// Argument templates (`{threads}`, `{cores}`, `{size}`)
    #[serde(default)]
    pub args: Vec<String>,

    /// Empty for a variant means "same markers as the baseline"
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub markers: Vec<Marker>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trials: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_env: Option<String>,

    #[serde(default, skip_serializing_if = "SweepConfig::is_empty")]
    pub sweep: SweepConfig,
}

/// Sweep dimensions of a variant.
///
/// Explicit `points` win; otherwise the listed dimensions are combined,
/// sizes outermost and threads innermost.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sizes: Vec<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cores: Vec<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub threads: Vec<usize>,
    /// Sweep threads over 1..=online cores
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub threads_up_to_cores: bool,
    pub hosts: HostMode,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub points: Vec<SweepPoint>,
}

/// Where results go. Every file is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csv: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<PathBuf>,
}

fn default_trials() -> usize {
    DEFAULT_TRIALS
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_thread_env() -> String {
    DEFAULT_THREAD_ENV.to_string()
}

impl SweepConfig {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Enumerate sweep points in run order.
    pub fn points(&self) -> Vec<SweepPoint> {
        if !self.points.is_empty() {
            return self.points.clone();
        }

        let threads: Vec<usize> = if self.threads_up_to_cores {
            cpu::thread_range()
        } else {
            self.threads.clone()
        };

        let sizes = optional_axis(&self.sizes);
        let cores = optional_axis(&self.cores);
        let threads = optional_axis(&threads);

        let mut points = Vec::with_capacity(sizes.len() * cores.len() * threads.len());
        for &size in &sizes {
            for &core_count in &cores {
                for &thread_count in &threads {
                    points.push(SweepPoint {
                        threads: thread_count,
                        cores: core_count,
                        size,
                        hosts: self.hosts,
                    });
                }
            }
        }
        points
    }
}

/// An empty axis contributes a single "not set" value.
fn optional_axis<T: Copy>(values: &[T]) -> Vec<Option<T>> {
    if values.is_empty() {
        vec![None]
    } else {
        values.iter().copied().map(Some).collect()
    }
}

impl ProgramConfig {
    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
            markers: Vec::new(),
            trials: None,
            thread_env: None,
            sweep: SweepConfig::default(),
        }
    }
}

impl BenchConfig {
    /// Load configuration from a TOML file.
    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).map_err(|e| {
            HarnessError::config(format!("cannot read {}: {e}", path.as_ref().display()))
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Per-trial timeout, `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    pub fn trials_for(&self, program: &ProgramConfig) -> usize {
        program.trials.unwrap_or(self.trials)
    }

    /// Resolve a program config into the [`ProgramSpec`] the aggregator consumes.
    pub fn spec_for(&self, program: &ProgramConfig) -> ProgramSpec {
        let markers = if program.markers.is_empty() {
            self.baseline.markers.clone()
        } else {
            program.markers.clone()
        };
        ProgramSpec {
            name: program.name.clone(),
            program: program.program.clone(),
            args: program.args.clone(),
            markers,
            thread_env: Some(
                program
                    .thread_env
                    .clone()
                    .unwrap_or_else(|| self.thread_env.clone()),
            ),
            launcher: self.launcher.clone(),
        }
    }

    pub fn sweep_for(&self, program: &ProgramConfig) -> Sweep {
        Sweep::new(program.sweep.points(), self.trials_for(program))
    }

    /// Check everything that can be checked without spawning a process.
    pub fn validate(&self) -> Result<()> {
        if self.baseline.markers.is_empty() {
            return Err(HarnessError::config("baseline has no markers"));
        }
        if !self.baseline.sweep.is_empty() {
            return Err(HarnessError::config(
                "baseline cannot have a sweep; it runs once per trial with no sweep dimension",
            ));
        }

        let mut names = HashSet::new();
        for program in std::iter::once(&self.baseline).chain(&self.variants) {
            if program.name.trim().is_empty() {
                return Err(HarnessError::config("program name cannot be empty"));
            }
            if !names.insert(program.name.as_str()) {
                return Err(HarnessError::config(format!(
                    "duplicate program name '{}'",
                    program.name
                )));
            }
            if program.program.trim().is_empty() {
                return Err(HarnessError::config(format!(
                    "'{}' has no program path",
                    program.name
                )));
            }

            let trials = self.trials_for(program);
            if trials < MIN_SAMPLES {
                return Err(HarnessError::config(format!(
                    "'{}' runs {trials} trials; the trimmed mean needs at least {MIN_SAMPLES}",
                    program.name
                )));
            }

            let spec = self.spec_for(program);
            let mut labels = HashSet::new();
            for marker in &spec.markers {
                if marker.pattern.is_empty() || marker.label.is_empty() {
                    return Err(HarnessError::config(format!(
                        "'{}' has an empty marker",
                        program.name
                    )));
                }
                if !labels.insert(marker.label.as_str()) {
                    return Err(HarnessError::config(format!(
                        "'{}' lists marker {:?} twice",
                        program.name, marker.label
                    )));
                }
            }

            let points = if std::ptr::eq(program, &self.baseline) {
                vec![SweepPoint::baseline()]
            } else {
                program.sweep.points()
            };
            for point in &points {
                spec.invocation(point)?;
            }
        }

        Ok(())
    }
}

impl Default for BenchConfig {
    /// The translator study: sequential baseline against the MPI+OpenMP
    /// build on 6 cores of one machine and 12 cores across two.
    fn default() -> Self {
        let input = vec![
            "../allChromosomes_pretty.fa".to_string(),
            "../out.fa".to_string(),
        ];
        let phases = ["reading", "computation", "writing", "total"];

        let mut baseline = ProgramConfig::new("seq", "./sequence-translator");
        baseline.args = input.clone();
        baseline.markers = phases
            .iter()
            .map(|p| Marker::from(format!("{}{} time:", p[..1].to_uppercase(), &p[1..])))
            .collect();

        let opt_markers: Vec<Marker> = phases
            .iter()
            .zip(&baseline.markers)
            .map(|(p, m)| Marker::aliased(m.label.clone(), format!("Final {p} time:")))
            .collect();

        let mut opt6 = ProgramConfig::new("opt6", "sequence-translatorOPT");
        opt6.args = input.clone();
        opt6.markers = opt_markers.clone();
        opt6.sweep.cores = vec![6];

        let mut opt12 = ProgramConfig::new("opt12", "sequence-translatorOPT");
        opt12.args = input;
        opt12.markers = opt_markers;
        opt12.sweep.cores = vec![12];
        opt12.sweep.hosts = HostMode::Multi;

        Self {
            trials: DEFAULT_TRIALS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            thread_env: DEFAULT_THREAD_ENV.to_string(),
            launcher: Some(Launcher {
                command: "mpirun".to_string(),
                hostfile: Some("h2".to_string()),
                interface: Some("eno1".to_string()),
            }),
            baseline,
            variants: vec![opt6, opt12],
            output: OutputConfig {
                csv: Some(PathBuf::from("opt-results.csv")),
                json: None,
                chart: Some(PathBuf::from("opt-results.svg")),
            },
        }
    }
}
