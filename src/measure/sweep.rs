//! Sweep aggregation: repeated trials per sweep point, reduced per marker.
//!
//! Trials run strictly one after another and sweep points are visited in
//! the order given. A failing trial aborts its sweep point; no partial
//! aggregate is ever produced.

use serde::{Deserialize, Serialize};

use super::extract::{Marker, TimeExtractor};
use super::reduce::{trimmed_mean, MIN_SAMPLES};
use super::trial::{Invocation, TrialRunner};
use super::{Aggregate, HostMode, MarkerMap, SweepPoint};
use crate::error::{HarnessError, Result};

/// Raw samples per marker, one entry per trial.
pub type SampleSet = MarkerMap<Vec<f64>>;

/// Distributed launch command prepended when a sweep point sets a core count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Launcher {
    /// Launch executable, e.g. `mpirun`.
    pub command: String,
    /// Host list file, required for multi-host points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostfile: Option<String>,
    /// Network interface for the TCP transport on multi-host points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,
}

impl Launcher {
    pub fn mpirun() -> Self {
        Self {
            command: "mpirun".to_string(),
            hostfile: None,
            interface: None,
        }
    }

    fn wrap(&self, cores: usize, hosts: HostMode, inner: Invocation) -> Result<Invocation> {
        let mut wrapped = Invocation::new(self.command.as_str())
            .arg("-np")
            .arg(cores.to_string());

        if hosts == HostMode::Multi {
            let hostfile = self.hostfile.as_deref().ok_or_else(|| {
                HarnessError::config("multi-host sweep point requires a launcher hostfile")
            })?;
            wrapped = wrapped.arg("--hostfile").arg(hostfile);
            if let Some(iface) = &self.interface {
                wrapped = wrapped
                    .arg("--mca")
                    .arg("btl_tcp_if_include")
                    .arg(iface.as_str());
            }
            // Remote ranks only see variables the launcher exports.
            for (key, _) in &inner.env {
                wrapped = wrapped.arg("-x").arg(key.as_str());
            }
        }

        wrapped.env = inner.env;
        Ok(wrapped.arg(inner.program).args(inner.args))
    }
}

/// Everything needed to turn a sweep point into a concrete invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramSpec {
    pub name: String,
    pub program: String,
    /// Argument templates; `{threads}`, `{cores}` and `{size}` are substituted.
    pub args: Vec<String>,
    pub markers: Vec<Marker>,
    /// Environment variable the program reads its thread count from.
    pub thread_env: Option<String>,
    pub launcher: Option<Launcher>,
}

impl ProgramSpec {
    pub fn invocation(&self, point: &SweepPoint) -> Result<Invocation> {
        let args = self
            .args
            .iter()
            .map(|arg| render_template(arg, point))
            .collect::<Result<Vec<_>>>()?;

        let mut inv = Invocation::new(self.program.as_str()).args(args);
        if let (Some(threads), Some(var)) = (point.threads, &self.thread_env) {
            inv = inv.env(var.as_str(), threads.to_string());
        }

        match (point.cores, &self.launcher) {
            (Some(cores), Some(launcher)) => launcher.wrap(cores, point.hosts, inv),
            (_, None) if point.hosts == HostMode::Multi => Err(HarnessError::config(format!(
                "'{}': multi-host sweep point without a launcher",
                self.name
            ))),
            (None, Some(_)) if point.hosts == HostMode::Multi => Err(HarnessError::config(
                format!("'{}': multi-host sweep point needs a core count", self.name),
            )),
            (Some(cores), None) if !self.args.iter().any(|a| a.contains("{cores}")) => {
                Err(HarnessError::config(format!(
                    "'{}': sweep point sets cores={cores} but there is no launcher \
                     and no argument uses {{cores}}",
                    self.name
                )))
            }
            _ => Ok(inv),
        }
    }
}

fn render_template(arg: &str, point: &SweepPoint) -> Result<String> {
    let mut out = arg.to_string();
    let dims = [
        ("{threads}", point.threads.map(|v| v as u64)),
        ("{cores}", point.cores.map(|v| v as u64)),
        ("{size}", point.size),
    ];
    for (placeholder, value) in dims {
        if out.contains(placeholder) {
            let value = value.ok_or_else(|| {
                HarnessError::config(format!(
                    "argument {arg:?} uses {placeholder} but sweep point {point} \
                     has no such dimension"
                ))
            })?;
            out = out.replace(placeholder, &value.to_string());
        }
    }
    Ok(out)
}

/// Ordered sweep points plus the trial count run at each of them.
#[derive(Debug, Clone, PartialEq)]
pub struct Sweep {
    pub points: Vec<SweepPoint>,
    pub trials: usize,
}

impl Sweep {
    pub fn new(points: Vec<SweepPoint>, trials: usize) -> Self {
        Self { points, trials }
    }

    /// The single, dimensionless point a sequential baseline runs at.
    pub fn baseline(trials: usize) -> Self {
        Self::new(vec![SweepPoint::baseline()], trials)
    }
}

/// Result for one sweep point, keeping the raw samples behind the aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct PointOutcome {
    pub point: SweepPoint,
    pub samples: SampleSet,
    pub aggregate: Aggregate,
}

/// Reduce every marker's samples with the trimmed mean.
pub fn reduce_samples(samples: &SampleSet) -> Result<Aggregate> {
    samples
        .iter()
        .map(|(marker, values)| trimmed_mean(values).map(|mean| (marker, mean)))
        .collect()
}

/// Drives a [`TrialRunner`] across sweep points.
pub struct SweepAggregator<R: TrialRunner> {
    runner: R,
}

impl<R: TrialRunner> SweepAggregator<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn into_runner(self) -> R {
        self.runner
    }

    /// One `(point, aggregate)` pair per sweep point, in sweep order.
    pub fn aggregate(
        &mut self,
        spec: &ProgramSpec,
        sweep: &Sweep,
    ) -> Result<Vec<(SweepPoint, Aggregate)>> {
        Ok(self
            .aggregate_with_samples(spec, sweep)?
            .into_iter()
            .map(|o| (o.point, o.aggregate))
            .collect())
    }

    /// Aggregate a program that has no sweep dimension.
    pub fn baseline(&mut self, spec: &ProgramSpec, trials: usize) -> Result<Aggregate> {
        let mut outcomes = self.aggregate_with_samples(spec, &Sweep::baseline(trials))?;
        Ok(outcomes.remove(0).aggregate)
    }

    pub fn aggregate_with_samples(
        &mut self,
        spec: &ProgramSpec,
        sweep: &Sweep,
    ) -> Result<Vec<PointOutcome>> {
        if spec.markers.is_empty() {
            return Err(HarnessError::config(format!("'{}' has no markers", spec.name)));
        }
        if sweep.trials < MIN_SAMPLES {
            return Err(HarnessError::InsufficientSamples {
                count: sweep.trials,
            });
        }
        let extractor = TimeExtractor::new(spec.markers.as_slice())?;

        let mut outcomes = Vec::with_capacity(sweep.points.len());
        for point in &sweep.points {
            let outcome = self
                .run_point(spec, &extractor, point, sweep.trials)
                .map_err(|e| HarnessError::Sweep {
                    program: spec.name.clone(),
                    point: point.clone(),
                    source: Box::new(e),
                })?;
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    fn run_point(
        &mut self,
        spec: &ProgramSpec,
        extractor: &TimeExtractor,
        point: &SweepPoint,
        trials: usize,
    ) -> Result<PointOutcome> {
        let invocation = spec.invocation(point)?;
        log::info!("{} [{}]: {} trials", spec.name, point, trials);
        log::debug!("invocation: {}", invocation);

        let mut samples: SampleSet = extractor
            .markers()
            .map(|m| (m, Vec::with_capacity(trials)))
            .collect();

        for trial in 0..trials {
            let output = self.runner.run(&invocation)?;
            let extracted = extractor.extract(&output)?;
            log::debug!("{} [{}] trial {}: {:?}", spec.name, point, trial + 1, extracted);

            for (marker, value) in extracted.iter() {
                if let Some(column) = samples.get_mut(marker) {
                    column.push(*value);
                }
            }
        }

        let aggregate = reduce_samples(&samples)?;
        log::info!("{} [{}]: {:?}", spec.name, point, aggregate);

        Ok(PointOutcome {
            point: point.clone(),
            samples,
            aggregate,
        })
    }
}
