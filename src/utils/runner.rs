//! Suite runner: baseline first, then every variant, then speedups.
//!
//! Everything runs on the calling thread, one process at a time. The first
//! failure aborts the suite and nothing is reported.

use serde::Serialize;

use crate::error::{HarnessError, Result};
use crate::measure::speedup::SpeedupRow;
use crate::measure::{
    compute_speedups, Aggregate, Invocation, MarkerMap, PointOutcome, SweepAggregator,
    SweepPoint, TrialRunner,
};
use crate::registry::{ProgramRegistry, RegisteredProgram};
use crate::utils::stats::{summarize, SampleStats};

/// Results for one sweep point of one program.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointReport {
    pub point: SweepPoint,
    /// Trimmed-mean seconds per marker
    pub means: Aggregate,
    pub stats: MarkerMap<SampleStats>,
    /// Percent of baseline speed; absent for the baseline itself
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speedups: Option<MarkerMap<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgramReport {
    pub name: String,
    pub program: String,
    pub role: &'static str,
    pub trials: usize,
    pub points: Vec<PointReport>,
}

/// Everything a reporter needs from one harness run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuiteReport {
    /// Marker labels in baseline order
    pub markers: Vec<String>,
    pub baseline: ProgramReport,
    pub variants: Vec<ProgramReport>,
}

impl SuiteReport {
    /// Trimmed-mean seconds of the baseline.
    pub fn baseline_means(&self) -> &Aggregate {
        &self.baseline.points[0].means
    }
}

/// One planned process launch, for dry runs.
#[derive(Debug, Clone)]
pub struct PlannedRun {
    pub program: String,
    pub point: SweepPoint,
    pub trials: usize,
    pub invocation: Invocation,
}

/// Resolve every invocation the suite would launch, without launching anything.
pub fn plan_suite(registry: &ProgramRegistry) -> Result<Vec<PlannedRun>> {
    let mut plan = Vec::new();
    for program in registry.all() {
        for point in &program.sweep.points {
            plan.push(PlannedRun {
                program: program.name().to_string(),
                point: point.clone(),
                trials: program.sweep.trials,
                invocation: program.spec.invocation(point)?,
            });
        }
    }
    Ok(plan)
}

/// Run the baseline and all variants, and compute speedups.
pub fn run_suite<R: TrialRunner>(registry: &ProgramRegistry, runner: R) -> Result<SuiteReport> {
    let mut aggregator = SweepAggregator::new(runner);

    let baseline = registry.baseline();
    let outcomes = aggregator.aggregate_with_samples(&baseline.spec, &baseline.sweep)?;
    let baseline_report = program_report(baseline, outcomes, None);
    let baseline_means = baseline_report.points[0].means.clone();

    let mut variants = Vec::with_capacity(registry.variants().len());
    for variant in registry.variants() {
        let outcomes = aggregator.aggregate_with_samples(&variant.spec, &variant.sweep)?;

        let pairs: Vec<(SweepPoint, Aggregate)> = outcomes
            .iter()
            .map(|o| (o.point.clone(), o.aggregate.clone()))
            .collect();
        let table = compute_speedups(&baseline_means, &pairs)
            .map_err(|e| with_program(variant.name(), e))?;

        variants.push(program_report(variant, outcomes, Some(table.rows())));
    }

    Ok(SuiteReport {
        markers: baseline_means.markers().map(str::to_string).collect(),
        baseline: baseline_report,
        variants,
    })
}

fn program_report(
    program: &RegisteredProgram,
    outcomes: Vec<PointOutcome>,
    speedups: Option<&[SpeedupRow]>,
) -> ProgramReport {
    let points = outcomes
        .into_iter()
        .enumerate()
        .map(|(idx, outcome)| PointReport {
            stats: summarize(&outcome.samples),
            speedups: speedups.and_then(|rows| rows.get(idx)).map(|row| row.speedups.clone()),
            point: outcome.point,
            means: outcome.aggregate,
        })
        .collect();

    ProgramReport {
        name: program.name().to_string(),
        program: program.spec.program.clone(),
        role: program.role.as_str(),
        trials: program.sweep.trials,
        points,
    }
}

/// Attach the program name to speedup errors, which only know their point.
fn with_program(program: &str, err: HarnessError) -> HarnessError {
    let point = match &err {
        HarnessError::MarkerMismatch { point, .. } | HarnessError::DivisionByZero { point, .. } => {
            point.clone()
        }
        _ => return err,
    };
    HarnessError::Sweep {
        program: program.to_string(),
        point,
        source: Box::new(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BenchConfig;

    /// Answers with canned output for the first needle found in the command line.
    struct TableRunner(Vec<(&'static str, String)>);

    impl TrialRunner for TableRunner {
        fn run(&mut self, invocation: &Invocation) -> Result<String> {
            let line = invocation.to_string();
            self.0
                .iter()
                .find(|(needle, _)| line.contains(needle))
                .map(|(_, out)| out.clone())
                .ok_or_else(|| HarnessError::execution(&invocation.program, "unexpected program"))
        }
    }

    fn translator_output(prefix: &str, r: f64, c: f64, w: f64, t: f64) -> String {
        format!(
            "{prefix}reading time: {r} seconds\n{prefix}computation time: {c} seconds\n\
             {prefix}writing time: {w} seconds\n{prefix}total time: {t} seconds\n"
        )
    }

    #[test]
    fn test_suite_on_default_config() {
        let registry = ProgramRegistry::from_config(&BenchConfig::default()).unwrap();
        let runner = TableRunner(vec![
            ("-np 6 ", translator_output("Final ", 4.0, 2.0, 2.0, 8.0)),
            ("-np 12 ", translator_output("Final ", 2.0, 1.0, 4.0, 7.0)),
            (
                "./sequence-translator",
                "Reading time: 4s\nComputation time: 8s\nWriting time: 2s\nTotal time: 14s\n"
                    .to_string(),
            ),
        ]);

        let report = run_suite(&registry, runner).unwrap();

        assert_eq!(
            report.markers,
            ["Reading time:", "Computation time:", "Writing time:", "Total time:"]
        );
        assert_eq!(report.baseline_means().get("Total time:"), Some(&14.0));
        assert!(report.baseline.points[0].speedups.is_none());

        let opt6 = &report.variants[0].points[0];
        let speedups = opt6.speedups.as_ref().unwrap();
        assert_eq!(speedups.get("Computation time:"), Some(&400.0));
        assert_eq!(speedups.get("Reading time:"), Some(&100.0));
        assert_eq!(speedups.get("Total time:"), Some(&175.0));

        let opt12 = &report.variants[1].points[0];
        assert_eq!(opt12.point, SweepPoint::cores(12, crate::measure::HostMode::Multi));
        assert_eq!(opt12.speedups.as_ref().unwrap().get("Writing time:"), Some(&50.0));
        assert_eq!(opt12.stats.get("Total time:").unwrap().count, 3);
    }

    #[test]
    fn test_marker_mismatch_names_program() {
        let mut config = BenchConfig::default();
        config.variants.truncate(1);
        // opt6 stops reporting the total time
        config.variants[0].markers.truncate(3);

        let registry = ProgramRegistry::from_config(&config).unwrap();
        let runner = TableRunner(vec![
            (
                "-np 6 ",
                "Final reading time: 1 Final computation time: 1 Final writing time: 1".to_string(),
            ),
            (
                "./sequence-translator",
                "Reading time: 1s Computation time: 1s Writing time: 1s Total time: 3s".to_string(),
            ),
        ]);

        let err = run_suite(&registry, runner).unwrap_err();
        assert!(err.to_string().contains("'opt6'"), "{err}");
        assert!(matches!(
            err.root(),
            HarnessError::MarkerMismatch { marker, .. } if marker == "Total time:"
        ));
    }

    #[test]
    fn test_plan_suite_lists_every_point() {
        let registry = ProgramRegistry::from_config(&BenchConfig::default()).unwrap();
        let plan = plan_suite(&registry).unwrap();

        let names: Vec<_> = plan.iter().map(|p| p.program.as_str()).collect();
        assert_eq!(names, ["seq", "opt6", "opt12"]);
        assert_eq!(
            plan[0].invocation.to_string(),
            "./sequence-translator ../allChromosomes_pretty.fa ../out.fa"
        );
        assert!(plan.iter().all(|p| p.trials == 3));
    }
}
