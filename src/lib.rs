//! # Speedup Harness
//!
//! Runs external programs repeatedly, scrapes the phase timings they print,
//! reduces each phase to a trimmed mean and reports how much faster every
//! parallel variant is than the sequential baseline.

pub mod config;
pub mod error;
pub mod measure;
pub mod registry;
pub mod utils;

/// Terminal reporting, used directly by the `speedup-bench` binary
pub use utils::tui;

pub use utils::runner::run_suite;

/// Re-export commonly used items
pub mod prelude {
    pub use crate::config::BenchConfig;
    pub use crate::error::{HarnessError, Result};
    pub use crate::measure::{
        compute_speedups, trimmed_mean, Aggregate, HostMode, Marker, ProcessRunner, SweepPoint,
        TimeExtractor, TrialRunner,
    };
    pub use crate::registry::ProgramRegistry;
    pub use crate::utils::SuiteReport;
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    #[test]
    fn test_default_config_registry_verify() {
        let config = BenchConfig::default();
        let registry = ProgramRegistry::from_config(&config).unwrap();

        println!("Verifying {} programs...", registry.list_names().len());

        for program in registry.all() {
            println!("Verifying program: {}", program.name());
            for point in &program.sweep.points {
                match program.spec.invocation(point) {
                    Ok(inv) => println!("  ✅ {} at {}: {}", program.name(), point, inv),
                    Err(e) => panic!("  ❌ '{}' at {} failed: {}", program.name(), point, e),
                }
            }
        }
    }
}
