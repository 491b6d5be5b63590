//! Text User Interface (TUI) utilities.
//!
//! Handles formatted output for the CLI.

use crate::measure::MarkerMap;
use crate::registry::{ProgramRegistry, RegisteredProgram};
use crate::utils::cpu;
use crate::utils::runner::{PlannedRun, ProgramReport, SuiteReport};
use crate::utils::stats::SampleStats;
use terminal_size::{terminal_size, Width};

/// Get the current terminal width, constrained to a reasonable range
fn get_term_width() -> usize {
    if let Some((Width(w), _)) = terminal_size() {
        (w as usize).clamp(40, 200)
    } else {
        80
    }
}

/// Truncate string with ellipsis if it exceeds width (character-wise)
fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut result: String = s.chars().take(width.saturating_sub(3)).collect();
        result.push_str("...");
        result
    }
}

/// Seconds with a unit that keeps three significant decimals readable.
pub fn format_seconds(secs: f64) -> String {
    if secs >= 1.0 {
        format!("{:.3} s", secs)
    } else if secs >= 1e-3 {
        format!("{:.3} ms", secs * 1e3)
    } else {
        format!("{:.3} µs", secs * 1e6)
    }
}

/// Print the application header
pub fn print_header() {
    let term_width = get_term_width().min(80); // Cap header at 80
    let title = " Speedup Harness ";
    let padding = term_width.saturating_sub(title.len() + 2) / 2;
    let right_padding = term_width.saturating_sub(padding + title.len());

    let border = "═".repeat(term_width);

    println!("╔{}╗", border);
    println!(
        "║{}{}{}║",
        " ".repeat(padding),
        title,
        " ".repeat(right_padding)
    );
    println!("╚{}╝", border);
    println!("  Host: {} online cores", cpu::online_cores());
    println!();
}

/// Print program info box
pub fn print_program_info_box(program: &RegisteredProgram) {
    let term_width = get_term_width();
    let max_content_width = term_width.saturating_sub(4).max(40);

    let markers: Vec<&str> = program.spec.markers.iter().map(|m| m.label.as_str()).collect();
    let name_line = format!("Program: {} [{}]", program.name(), program.role.as_str());
    let cmd_line = format!(
        "Command: {} {}",
        program.spec.program,
        program.spec.args.join(" ")
    );
    let marker_line = format!("Markers: {}", markers.join(", "));
    let sweep_line = format!(
        "Sweep:   {} point(s) x {} trial(s)",
        program.sweep.points.len(),
        program.sweep.trials
    );

    let lines = [name_line, cmd_line, marker_line, sweep_line];
    let content_width = lines
        .iter()
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(60)
        .min(max_content_width);

    let border = "─".repeat(content_width + 2);

    println!("┌{}┐", border);
    for (idx, line) in lines.iter().enumerate() {
        if idx == 2 {
            println!("├{}┤", border);
        }
        println!(
            "│ {:<width$} │",
            truncate(line, content_width),
            width = content_width
        );
    }
    println!("└{}┘", border);
    println!();
}

/// Print the per-marker table of every sweep point of one program
pub fn print_program_results(program: &ProgramReport) {
    let term_width = get_term_width();
    let fixed_width = 58;
    let marker_col_width = term_width.saturating_sub(fixed_width).max(15);
    let table_width = marker_col_width + 52 + 5;

    println!("  {} ({} trials per point)", program.name, program.trials);
    for point in &program.points {
        println!("  Point: {}", point.point);
        println!("  {}", "─".repeat(table_width));
        println!(
            "  {:<m_width$} {:>12} {:>12} {:>12} {:>7} {:>8}",
            "Marker",
            "Mean",
            "Min",
            "Max",
            "CV",
            "Speedup",
            m_width = marker_col_width
        );
        println!("  {}", "─".repeat(table_width));

        for (marker, mean) in point.means.iter() {
            let (min, max, cv) = match point.stats.get(marker) {
                Some(SampleStats { min, max, cv, .. }) => {
                    (format_seconds(*min), format_seconds(*max), format!("{:.1}%", cv * 100.0))
                }
                None => ("-".into(), "-".into(), "-".into()),
            };
            let speedup = point
                .speedups
                .as_ref()
                .and_then(|s| s.get(marker))
                .map(|pct| format!("{:.1}%", pct))
                .unwrap_or_else(|| "-".into());

            println!(
                "  {:<m_width$} {:>12} {:>12} {:>12} {:>7} {:>8}",
                truncate(marker, marker_col_width),
                format_seconds(*mean),
                min,
                max,
                cv,
                speedup,
                m_width = marker_col_width
            );
        }
        println!();
    }
}

/// Print every program of a finished suite, then the speedup matrix
pub fn print_suite_report(report: &SuiteReport) {
    print_program_results(&report.baseline);
    for variant in &report.variants {
        print_program_results(variant);
    }
    print_speedup_matrix(report);
}

/// One row per variant point, one column per marker
pub fn print_speedup_matrix(report: &SuiteReport) {
    if report.variants.is_empty() {
        return;
    }

    let rows: Vec<(String, &MarkerMap<f64>)> = report
        .variants
        .iter()
        .flat_map(|v| {
            v.points.iter().filter_map(move |p| {
                p.speedups
                    .as_ref()
                    .map(|s| (format!("{} {}", v.name, p.point), s))
            })
        })
        .collect();

    let label_width = rows
        .iter()
        .map(|(label, _)| label.chars().count())
        .max()
        .unwrap_or(10)
        .clamp(10, 40);
    let col_width = report
        .markers
        .iter()
        .map(|m| m.chars().count())
        .max()
        .unwrap_or(8)
        .clamp(8, 24);
    let table_width = label_width + (col_width + 1) * report.markers.len();

    println!("  Speedup vs {} (%)", report.baseline.name);
    println!("  {}", "─".repeat(table_width));
    print!("  {:<width$}", "", width = label_width);
    for marker in &report.markers {
        print!(" {:>width$}", truncate(marker, col_width), width = col_width);
    }
    println!();
    println!("  {}", "─".repeat(table_width));

    for (label, speedups) in rows {
        print!("  {:<width$}", truncate(&label, label_width), width = label_width);
        for marker in &report.markers {
            let cell = speedups
                .get(marker)
                .map(|pct| format!("{:.1}", pct))
                .unwrap_or_else(|| "-".into());
            print!(" {:>width$}", cell, width = col_width);
        }
        println!();
    }
    println!();
}

/// Print the list of configured programs
pub fn print_available_programs(registry: &ProgramRegistry) {
    println!("Configured programs:");
    println!();
    for program in registry.all() {
        println!(
            "  {:<20} [{}] - {} ({} point(s), {} trial(s))",
            program.name(),
            program.role.as_str(),
            program.spec.program,
            program.sweep.points.len(),
            program.sweep.trials
        );
    }
    println!();
    println!("  {} process launches in total", registry.total_launches());
}

/// Print the invocations a dry run would launch
pub fn print_plan(plan: &[PlannedRun]) {
    println!("Planned invocations:");
    println!();
    for run in plan {
        println!(
            "  {:<12} {:<28} x{}  {}",
            run.program,
            run.point.to_string(),
            run.trials,
            run.invocation
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Computation time:", 10), "Computa...");
        assert_eq!(truncate("µµµµ", 4), "µµµµ");
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(7.0), "7.000 s");
        assert_eq!(format_seconds(0.0125), "12.500 ms");
        assert_eq!(format_seconds(0.000002), "2.000 µs");
    }
}
