//! CSV and JSON export of a suite report.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::measure::{MarkerMap, SweepPoint};
use crate::utils::runner::{ProgramReport, SuiteReport};

/// Export the report as CSV: one row per sweep point and metric, one column per marker.
pub fn export_csv<P: AsRef<Path>>(path: P, report: &SuiteReport) -> Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    write_csv(&mut file, report)?;
    file.flush()?;
    Ok(())
}

pub fn write_csv<W: Write>(out: &mut W, report: &SuiteReport) -> Result<()> {
    let mut header = vec![
        "variant".to_string(),
        "threads".to_string(),
        "cores".to_string(),
        "size".to_string(),
        "hosts".to_string(),
        "metric".to_string(),
    ];
    header.extend(report.markers.iter().cloned());
    write_record(out, &header)?;

    for program in std::iter::once(&report.baseline).chain(&report.variants) {
        write_program_rows(out, program, &report.markers)?;
    }
    Ok(())
}

fn write_program_rows<W: Write>(
    out: &mut W,
    program: &ProgramReport,
    markers: &[String],
) -> Result<()> {
    for point in &program.points {
        write_row(out, &program.name, &point.point, "mean_s", &point.means, markers)?;
        if let Some(speedups) = &point.speedups {
            write_row(out, &program.name, &point.point, "speedup_pct", speedups, markers)?;
        }
    }
    Ok(())
}

fn write_row<W: Write>(
    out: &mut W,
    name: &str,
    point: &SweepPoint,
    metric: &str,
    values: &MarkerMap<f64>,
    markers: &[String],
) -> Result<()> {
    let opt = |v: Option<String>| v.unwrap_or_default();

    let mut record = vec![
        name.to_string(),
        opt(point.threads.map(|v| v.to_string())),
        opt(point.cores.map(|v| v.to_string())),
        opt(point.size.map(|v| v.to_string())),
        point.hosts.as_str().to_string(),
        metric.to_string(),
    ];
    record.extend(
        markers
            .iter()
            .map(|m| opt(values.get(m).map(|v| v.to_string()))),
    );
    write_record(out, &record)
}

fn write_record<W: Write>(out: &mut W, fields: &[String]) -> Result<()> {
    let line: Vec<String> = fields.iter().map(|f| csv_field(f)).collect();
    writeln!(out, "{}", line.join(","))?;
    Ok(())
}

/// Quote a field when it contains a separator, quote or line break.
fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Export the whole report as pretty-printed JSON.
pub fn export_json<P: AsRef<Path>>(path: P, report: &SuiteReport) -> Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut file, report)?;
    writeln!(file)?;
    file.flush()?;
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_layout() {
        let mut buf = Vec::new();
        write_csv(&mut buf, &fixtures::report()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines,
            [
                "variant,threads,cores,size,hosts,metric,Reading time:,Total time:",
                "seq,,,,single,mean_s,2,10",
                "omp,1,,,single,mean_s,2,10",
                "omp,1,,,single,speedup_pct,100,100",
                "omp,2,,,single,mean_s,2,5",
                "omp,2,,,single,speedup_pct,100,200",
                "\"opt, 12\",,12,,multi,mean_s,4,2.5",
                "\"opt, 12\",,12,,multi,speedup_pct,50,400",
            ]
        );
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_export_files() {
        let dir = tempfile::tempdir().unwrap();
        let report = fixtures::report();

        let csv_path = dir.path().join("speedups.csv");
        export_csv(&csv_path, &report).unwrap();
        let csv = std::fs::read_to_string(&csv_path).unwrap();
        assert_eq!(csv.lines().count(), 8);

        let json_path = dir.path().join("speedups.json");
        export_json(&json_path, &report).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();

        assert_eq!(json["baseline"]["name"], "seq");
        assert_eq!(json["variants"][0]["points"][1]["point"]["threads"], 2);
        assert_eq!(json["variants"][0]["points"][1]["speedups"]["Total time:"], 200.0);
        assert_eq!(json["variants"][1]["points"][0]["point"]["hosts"], "multi");
        assert!(json["baseline"]["points"][0].get("speedups").is_none());
    }
}
