//! speedup-bench CLI: run a configured baseline and its parallel variants.
//!
//! Usage:
//!   speedup-bench init                      # Write a starter bench.toml
//!   speedup-bench check -c bench.toml       # Validate without running
//!   speedup-bench list -c bench.toml        # List configured programs
//!   speedup-bench run -c bench.toml --csv results.csv
//!   speedup-bench run --only opt12 --trials 8 --dry-run

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use speedup_harness::config::BenchConfig;
use speedup_harness::error::{HarnessError, Result};
use speedup_harness::measure::reduce::MIN_SAMPLES;
use speedup_harness::measure::ProcessRunner;
use speedup_harness::registry::ProgramRegistry;
use speedup_harness::tui;
use speedup_harness::utils::{export_chart, export_csv, export_json, plan_suite, run_suite};

#[derive(Parser)]
#[command(name = "speedup-bench")]
#[command(about = "Measure parallel speedups of external programs against a sequential baseline")]
#[command(version)]
struct Cli {
    /// Benchmark configuration file
    #[arg(short, long, global = true, default_value = "bench.toml")]
    config: PathBuf,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the baseline and every variant, then report speedups
    Run {
        /// Write results as CSV (overrides [output].csv)
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Write the full report as JSON (overrides [output].json)
        #[arg(long)]
        json: Option<PathBuf>,

        /// Write an SVG speedup chart (overrides [output].chart)
        #[arg(long)]
        chart: Option<PathBuf>,

        /// Trials per sweep point for every program
        #[arg(short, long)]
        trials: Option<usize>,

        /// Per-trial timeout in seconds, 0 disables it
        #[arg(long)]
        timeout: Option<u64>,

        /// Only run these variants (the baseline always runs)
        #[arg(long)]
        only: Vec<String>,

        /// Print the planned invocations without launching anything
        #[arg(long)]
        dry_run: bool,
    },

    /// List configured programs
    List,

    /// Validate the configuration and resolve every invocation
    Check,

    /// Write a starter configuration
    Init {
        /// Output configuration file
        #[arg(short, long, default_value = "bench.toml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Output overrides collected from the command line.
struct RunOptions {
    csv: Option<PathBuf>,
    json: Option<PathBuf>,
    chart: Option<PathBuf>,
    trials: Option<usize>,
    timeout: Option<u64>,
    only: Vec<String>,
    dry_run: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            csv,
            json,
            chart,
            trials,
            timeout,
            only,
            dry_run,
        } => cmd_run(
            &cli.config,
            RunOptions {
                csv,
                json,
                chart,
                trials,
                timeout,
                only,
                dry_run,
            },
        ),
        Commands::List => cmd_list(&cli.config),
        Commands::Check => cmd_check(&cli.config),
        Commands::Init { output, force } => cmd_init(&output, force),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    match verbose {
        0 => {}
        1 => {
            builder.filter_level(log::LevelFilter::Info);
        }
        2 => {
            builder.filter_level(log::LevelFilter::Debug);
        }
        _ => {
            builder.filter_level(log::LevelFilter::Trace);
        }
    }
    builder.init();
}

fn load_registry(config_path: &Path) -> Result<(BenchConfig, ProgramRegistry)> {
    let config = BenchConfig::load_toml(config_path)?;
    let registry = ProgramRegistry::from_config(&config)?;
    log::info!(
        "loaded {} with {} program(s)",
        config_path.display(),
        registry.list_names().len()
    );
    Ok((config, registry))
}

fn cmd_run(config_path: &Path, opts: RunOptions) -> Result<()> {
    let (mut config, mut registry) = load_registry(config_path)?;

    registry.retain_variants(&opts.only)?;
    if let Some(trials) = opts.trials {
        if trials < MIN_SAMPLES {
            return Err(HarnessError::config(format!(
                "--trials must be at least {MIN_SAMPLES}, got {trials}"
            )));
        }
        registry.set_trials(trials);
    }
    if let Some(secs) = opts.timeout {
        config.timeout_secs = secs;
    }

    tui::print_header();
    for program in registry.all() {
        tui::print_program_info_box(program);
    }

    if opts.dry_run {
        tui::print_plan(&plan_suite(&registry)?);
        return Ok(());
    }

    let runner = ProcessRunner::new(config.timeout());
    let report = run_suite(&registry, runner)?;

    tui::print_suite_report(&report);

    let csv = opts.csv.or(config.output.csv);
    let json = opts.json.or(config.output.json);
    let chart = opts.chart.or(config.output.chart);

    if let Some(path) = csv {
        export_csv(&path, &report)?;
        println!("CSV written to {}", path.display());
    }
    if let Some(path) = json {
        export_json(&path, &report)?;
        println!("JSON written to {}", path.display());
    }
    if let Some(path) = chart {
        export_chart(&path, &report)?;
        println!("Chart written to {}", path.display());
    }

    println!("Note: Speedup is baseline time / variant time, 100% = same speed as the baseline.");
    Ok(())
}

fn cmd_list(config_path: &Path) -> Result<()> {
    let (_, registry) = load_registry(config_path)?;
    tui::print_available_programs(&registry);
    Ok(())
}

fn cmd_check(config_path: &Path) -> Result<()> {
    let (_, registry) = load_registry(config_path)?;
    let plan = plan_suite(&registry)?;

    for program in registry.all() {
        let path = Path::new(&program.spec.program);
        if path.components().count() > 1 && !path.exists() {
            log::warn!(
                "'{}': {} does not exist yet",
                program.name(),
                path.display()
            );
        }
    }

    println!(
        "Configuration OK: {} program(s), {} sweep point(s), {} process launch(es)",
        registry.list_names().len(),
        plan.len(),
        registry.total_launches()
    );
    Ok(())
}

fn cmd_init(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        return Err(HarnessError::config(format!(
            "{} already exists, pass --force to overwrite",
            output.display()
        )));
    }
    BenchConfig::default().save_toml(output)?;
    println!("Wrote starter configuration to {}", output.display());
    Ok(())
}
