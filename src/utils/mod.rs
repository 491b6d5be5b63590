//! Utility modules for running suites and reporting results.

pub mod chart;
pub mod cpu;
pub mod export;
pub mod runner;
pub mod stats;
pub mod tui;

// Re-export commonly used items
pub use chart::{export_chart, render_speedup_chart};
pub use export::{export_csv, export_json};
pub use runner::{plan_suite, run_suite, PlannedRun, PointReport, ProgramReport, SuiteReport};
pub use stats::{calculate_std_dev, summarize, SampleStats};
