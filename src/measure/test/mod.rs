//! End-to-end tests of the measurement pipeline with scripted programs.

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use crate::error::{HarnessError, Result};
    use crate::measure::*;

    const MARKERS: [&str; 4] = [
        "Reading time:",
        "Computation time:",
        "Writing time:",
        "Total time:",
    ];

    /// Replays canned outputs in order and records every invocation.
    struct ScriptedRunner {
        outputs: VecDeque<Result<String>>,
        seen: Vec<Invocation>,
    }

    impl ScriptedRunner {
        fn new<I: IntoIterator<Item = Result<String>>>(outputs: I) -> Self {
            Self {
                outputs: outputs.into_iter().collect(),
                seen: Vec::new(),
            }
        }
    }

    impl TrialRunner for ScriptedRunner {
        fn run(&mut self, invocation: &Invocation) -> Result<String> {
            self.seen.push(invocation.clone());
            self.outputs.pop_front().unwrap_or_else(|| {
                Err(HarnessError::execution(
                    &invocation.program,
                    "script exhausted",
                ))
            })
        }
    }

    /// Computes the output from the invocation.
    struct FnRunner<F>(F);

    impl<F: FnMut(&Invocation) -> Result<String>> TrialRunner for FnRunner<F> {
        fn run(&mut self, invocation: &Invocation) -> Result<String> {
            (self.0)(invocation)
        }
    }

    fn line(r: f64, c: f64, w: f64, t: f64) -> Result<String> {
        Ok(format!(
            "Reading time:{r} Computation time:{c} Writing time:{w} Total time:{t}"
        ))
    }

    fn spec(markers: &[&str]) -> ProgramSpec {
        ProgramSpec {
            name: "translator".into(),
            program: "./translator".into(),
            args: vec!["in.fa".into(), "out.fa".into()],
            markers: markers.iter().map(|&m| Marker::from(m)).collect(),
            thread_env: Some("OMP_NUM_THREADS".into()),
            launcher: None,
        }
    }

    #[test]
    fn test_five_trials_trimmed_per_marker() {
        let runner = ScriptedRunner::new([
            line(2.5, 3.0, 1.5, 7.0),
            line(2.6, 3.1, 1.4, 7.1),
            line(2.4, 2.9, 1.6, 6.9),
            line(2.5, 3.0, 1.5, 7.0),
            line(2.5, 3.0, 1.5, 7.0),
        ]);
        let mut aggregator = SweepAggregator::new(runner);

        let baseline = aggregator.baseline(&spec(&MARKERS), 5).unwrap();

        assert_eq!(baseline.get("Total time:"), Some(&7.0));
        assert_eq!(baseline.get("Reading time:"), Some(&2.5));
        assert_eq!(baseline.markers().collect::<Vec<_>>(), MARKERS);

        let runner = aggregator.into_runner();
        assert_eq!(runner.seen.len(), 5);
        assert!(runner.seen.iter().all(|inv| inv.env.is_empty()));
    }

    #[test]
    fn test_thread_sweep_speedups() {
        let markers = ["Total time:"];
        let mut baseline_agg = SweepAggregator::new(ScriptedRunner::new(
            (0..3).map(|_| Ok("Total time: 10.0s".to_string())),
        ));
        let baseline = baseline_agg.baseline(&spec(&markers), 3).unwrap();

        let runner = FnRunner(|inv: &Invocation| {
            let threads: f64 = inv
                .env
                .iter()
                .find(|(k, _)| k == "OMP_NUM_THREADS")
                .map(|(_, v)| v.parse().unwrap())
                .unwrap();
            Ok(format!("Total time: {}s", 10.0 / threads))
        });
        let points: Vec<_> = [1, 2, 4].into_iter().map(SweepPoint::threads).collect();
        let sweep = Sweep::new(points.clone(), 3);

        let variant = SweepAggregator::new(runner)
            .aggregate(&spec(&markers), &sweep)
            .unwrap();
        assert_eq!(
            variant.iter().map(|(p, _)| p.clone()).collect::<Vec<_>>(),
            points
        );
        assert_eq!(variant[2].1.get("Total time:"), Some(&2.5));

        let table = compute_speedups(&baseline, &variant).unwrap();
        let pct: Vec<f64> = table
            .rows()
            .iter()
            .map(|r| *r.speedups.get("Total time:").unwrap())
            .collect();
        assert_eq!(pct, [100.0, 200.0, 400.0]);
    }

    #[test]
    fn test_failed_trial_aborts_sweep_point() {
        let runner = ScriptedRunner::new([
            // threads=1
            Ok("Total time: 4.0".to_string()),
            Ok("Total time: 4.0".to_string()),
            Ok("Total time: 4.0".to_string()),
            // threads=2, second trial lost its timing line
            Ok("Total time: 2.0".to_string()),
            Ok("Segmentation fault".to_string()),
            Ok("Total time: 2.0".to_string()),
        ]);
        let mut aggregator = SweepAggregator::new(runner);
        let sweep = Sweep::new(vec![SweepPoint::threads(1), SweepPoint::threads(2)], 3);

        let err = aggregator
            .aggregate(&spec(&["Total time:"]), &sweep)
            .unwrap_err();
        match &err {
            HarnessError::Sweep { program, point, .. } => {
                assert_eq!(program, "translator");
                assert_eq!(*point, SweepPoint::threads(2));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(
            err.root(),
            HarnessError::ParseFailure { marker, text }
                if marker == "Total time:" && text == "Segmentation fault"
        ));

        // no retry, no further trials for the failed point
        assert_eq!(aggregator.into_runner().seen.len(), 5);
    }

    #[test]
    fn test_execution_failure_propagates() {
        let runner = ScriptedRunner::new([
            Ok("Total time: 1.0".to_string()),
            Err(HarnessError::execution("./translator", "exit status: 1")),
        ]);
        let err = SweepAggregator::new(runner)
            .baseline(&spec(&["Total time:"]), 3)
            .unwrap_err();

        assert!(err.to_string().contains("baseline"), "{err}");
        assert!(matches!(err.root(), HarnessError::ExecutionFailure { .. }));
    }

    #[test]
    fn test_too_few_trials_rejected_before_running() {
        let mut aggregator = SweepAggregator::new(ScriptedRunner::new([]));
        let err = aggregator
            .aggregate(&spec(&MARKERS), &Sweep::new(vec![SweepPoint::threads(1)], 2))
            .unwrap_err();

        assert!(matches!(err, HarnessError::InsufficientSamples { count: 2 }));
        assert!(aggregator.runner().seen.is_empty());
    }

    #[test]
    fn test_samples_kept_alongside_aggregate() {
        let runner = ScriptedRunner::new([
            Ok("Total time: 3.0".to_string()),
            Ok("Total time: 1.0".to_string()),
            Ok("Total time: 2.0".to_string()),
        ]);
        let outcomes = SweepAggregator::new(runner)
            .aggregate_with_samples(&spec(&["Total time:"]), &Sweep::baseline(3))
            .unwrap();

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].samples.get("Total time:"), Some(&vec![3.0, 1.0, 2.0]));
        assert_eq!(outcomes[0].aggregate.get("Total time:"), Some(&2.0));
    }
}
