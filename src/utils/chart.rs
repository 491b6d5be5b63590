//! SVG bar chart of speedups.
//!
//! One group of bars per marker, one bar per (variant, sweep point) series.
//! The dashed line marks 100 %, the speed of the baseline.

use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::utils::runner::SuiteReport;

const WIDTH: f64 = 960.0;
const HEIGHT: f64 = 480.0;
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 220.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 70.0;

const PALETTE: [&str; 8] = [
    "#4E79A7", "#F28E2B", "#59A14F", "#E15759", "#76B7B2", "#EDC948", "#B07AA1", "#9C755F",
];

/// One coloured bar per marker.
#[derive(Debug, Clone, PartialEq)]
struct Series {
    label: String,
    values: Vec<f64>,
}

fn collect_series(report: &SuiteReport) -> Vec<Series> {
    let mut series = Vec::new();
    for variant in &report.variants {
        for point in &variant.points {
            let Some(speedups) = &point.speedups else {
                continue;
            };
            let label = if point.point.is_baseline() {
                variant.name.clone()
            } else {
                format!("{} ({})", variant.name, point.point)
            };
            let values = report
                .markers
                .iter()
                .map(|m| speedups.get(m).copied().unwrap_or(0.0))
                .collect();
            series.push(Series { label, values });
        }
    }
    series
}

/// Smallest "nice" upper bound (1, 2 or 5 times a power of ten) at or above `max`.
fn axis_max(max: f64) -> f64 {
    let max = max.max(100.0);
    let magnitude = 10f64.powf(max.log10().floor());
    for step in [1.0, 2.0, 5.0, 10.0] {
        if step * magnitude >= max {
            return step * magnitude;
        }
    }
    10.0 * magnitude
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Render the speedup chart as a standalone SVG document.
pub fn render_speedup_chart(report: &SuiteReport) -> String {
    let series = collect_series(report);
    let markers = &report.markers;

    let plot_w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_h = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let bottom = MARGIN_TOP + plot_h;

    let highest = series
        .iter()
        .flat_map(|s| s.values.iter().copied())
        .fold(0.0_f64, f64::max);
    let y_max = axis_max(highest);
    let y_of = |pct: f64| bottom - (pct / y_max) * plot_h;

    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{WIDTH}\" height=\"{HEIGHT}\" \
         font-family=\"monospace\" font-size=\"12\">\n"
    ));
    svg.push_str("  <rect width=\"100%\" height=\"100%\" fill=\"#ffffff\"/>\n");
    svg.push_str(&format!(
        "  <text x=\"{:.1}\" y=\"28\" text-anchor=\"middle\" font-size=\"16\" font-weight=\"bold\">\
         Speedup vs {} (%)</text>\n",
        MARGIN_LEFT + plot_w / 2.0,
        escape_xml(&report.baseline.name)
    ));

    // Grid and y labels
    for i in 0..=5 {
        let pct = y_max * i as f64 / 5.0;
        let y = y_of(pct);
        svg.push_str(&format!(
            "  <line x1=\"{MARGIN_LEFT}\" y1=\"{y:.1}\" x2=\"{:.1}\" y2=\"{y:.1}\" \
             stroke=\"#dddddd\"/>\n",
            MARGIN_LEFT + plot_w
        ));
        svg.push_str(&format!(
            "  <text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"end\">{pct:.0}</text>\n",
            MARGIN_LEFT - 6.0,
            y + 4.0
        ));
    }

    // Bars
    if !markers.is_empty() && !series.is_empty() {
        let group_w = plot_w / markers.len() as f64;
        let bar_w = group_w * 0.8 / series.len() as f64;

        for (m, marker) in markers.iter().enumerate() {
            let group_x = MARGIN_LEFT + group_w * m as f64 + group_w * 0.1;
            for (s, item) in series.iter().enumerate() {
                let value = item.values[m];
                let x = group_x + bar_w * s as f64;
                let y = y_of(value);
                svg.push_str(&format!(
                    "  <rect class=\"bar\" x=\"{x:.1}\" y=\"{y:.1}\" width=\"{bar_w:.1}\" \
                     height=\"{:.1}\" fill=\"{}\"><title>{}: {value:.1}%</title></rect>\n",
                    bottom - y,
                    PALETTE[s % PALETTE.len()],
                    escape_xml(&item.label)
                ));
            }
            svg.push_str(&format!(
                "  <text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"middle\">{}</text>\n",
                MARGIN_LEFT + group_w * (m as f64 + 0.5),
                bottom + 20.0,
                escape_xml(marker)
            ));
        }
    }

    // Axes
    svg.push_str(&format!(
        "  <line x1=\"{MARGIN_LEFT}\" y1=\"{MARGIN_TOP}\" x2=\"{MARGIN_LEFT}\" \
         y2=\"{bottom:.1}\" stroke=\"#333333\"/>\n"
    ));
    svg.push_str(&format!(
        "  <line x1=\"{MARGIN_LEFT}\" y1=\"{bottom:.1}\" x2=\"{:.1}\" y2=\"{bottom:.1}\" \
         stroke=\"#333333\"/>\n",
        MARGIN_LEFT + plot_w
    ));

    let reference = y_of(100.0);
    svg.push_str(&format!(
        "  <line class=\"reference\" x1=\"{MARGIN_LEFT}\" y1=\"{reference:.1}\" x2=\"{:.1}\" \
         y2=\"{reference:.1}\" stroke=\"#cc0000\" stroke-dasharray=\"6 4\"/>\n",
        MARGIN_LEFT + plot_w
    ));

    // Legend
    let legend_x = MARGIN_LEFT + plot_w + 20.0;
    for (s, item) in series.iter().enumerate() {
        let y = MARGIN_TOP + 20.0 * s as f64;
        svg.push_str(&format!(
            "  <rect x=\"{legend_x:.1}\" y=\"{y:.1}\" width=\"12\" height=\"12\" fill=\"{}\"/>\n",
            PALETTE[s % PALETTE.len()]
        ));
        svg.push_str(&format!(
            "  <text x=\"{:.1}\" y=\"{:.1}\">{}</text>\n",
            legend_x + 18.0,
            y + 10.0,
            escape_xml(&item.label)
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

/// Write the speedup chart to `path`.
pub fn export_chart<P: AsRef<Path>>(path: P, report: &SuiteReport) -> Result<()> {
    fs::write(path, render_speedup_chart(report))?;
    Ok(())
}
