//! Report emission: a human-readable text report, a CSV sidecar for
//! downstream analysis, and optional per-node route-row dumps.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::Utc;

use crate::metrics::{Average, ObserverStats};
use crate::observers::Observer;
use crate::Result;

/// Snapshot of the run handed to the report writer.
pub struct ReportSnapshot<'a> {
    pub name: &'a str,
    pub algorithm: &'a str,
    pub simulation_time: u64,
    pub wall_clock_s: f64,
    pub eta_s: f64,
    pub compute_time_ms: Average,
    pub updated_entries: Average,
    pub observers: &'a [Observer],
    pub stats: &'a [ObserverStats],
}

/// Write the text report and its CSV sidecar into `dir`, overwriting
/// the previous emission for the same scenario and algorithm.
pub fn write_report(dir: &Path, snapshot: &ReportSnapshot) -> Result<()> {
    fs::create_dir_all(dir)?;
    let stem = format!("report [{}] {}", snapshot.name, snapshot.algorithm);
    write_text(&dir.join(format!("{stem}.txt")), snapshot)?;
    write_csv(&dir.join(format!("{stem}.csv")), snapshot)?;
    Ok(())
}

fn write_text(path: &Path, snapshot: &ReportSnapshot) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "name: {}", snapshot.name)?;
    writeln!(out, "algorithm: {}", snapshot.algorithm)?;
    writeln!(out, "generated: {}", Utc::now().to_rfc3339())?;
    writeln!(out, "simulation time: {}", snapshot.simulation_time)?;
    writeln!(out, "real-world time: {:.3}", snapshot.wall_clock_s)?;
    writeln!(out, "estimated time of arrival: {:.3}", snapshot.eta_s)?;
    writeln!(out, "compute time: {:.6}", snapshot.compute_time_ms.mean())?;
    writeln!(out, "update entry: {:.3}", snapshot.updated_entries.mean())?;
    writeln!(out, "number of observers: {}", snapshot.observers.len())?;
    for (observer, stats) in snapshot.observers.iter().zip(snapshot.stats) {
        writeln!(out, "route path [{}, {}]", observer.src, observer.dst)?;
        writeln!(out, "\tlatency: {:.6}", stats.latency.mean())?;
        writeln!(out, "\tfailure rate: {:.6}", stats.failure_rate.mean())?;
    }
    Ok(())
}

fn write_csv(path: &Path, snapshot: &ReportSnapshot) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "src,dst,latency_ms,failure_rate")?;
    for (observer, stats) in snapshot.observers.iter().zip(snapshot.stats) {
        writeln!(
            out,
            "{},{},{:.6},{:.6}",
            observer.src,
            observer.dst,
            stats.latency.mean(),
            stats.failure_rate.mean()
        )?;
    }
    Ok(())
}

/// Dump one node's route row under
/// `{report_dir}/rib/{algorithm}/{node}/{epoch}.txt`, one wire code per
/// destination in id order.
pub fn write_rib_row(
    report_dir: &Path,
    algorithm: &str,
    node: usize,
    epoch: u64,
    row: &[u8],
) -> Result<()> {
    let dir = report_dir
        .join("rib")
        .join(algorithm)
        .join(node.to_string());
    fs::create_dir_all(&dir)?;

    let mut out = BufWriter::new(File::create(dir.join(format!("{epoch}.txt")))?);
    for (dst, hop) in row.iter().enumerate() {
        if dst > 0 {
            write!(out, " ")?;
        }
        write!(out, "{hop}")?;
    }
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn snapshot<'a>(observers: &'a [Observer], stats: &'a [ObserverStats]) -> ReportSnapshot<'a> {
        ReportSnapshot {
            name: "unit",
            algorithm: "MinHop",
            simulation_time: 42,
            wall_clock_s: 1.5,
            eta_s: 0.5,
            compute_time_ms: Average::default(),
            updated_entries: Average::default(),
            observers,
            stats,
        }
    }

    #[test]
    fn writes_text_and_csv() {
        let dir = tempdir().unwrap();
        let observers = [Observer { src: 0, dst: 5 }];
        let mut stats = [ObserverStats::default()];
        stats[0].record(grid_routing::PathResult::reached(3.25));

        write_report(dir.path(), &snapshot(&observers, &stats)).unwrap();

        let text =
            fs::read_to_string(dir.path().join("report [unit] MinHop.txt")).unwrap();
        assert!(text.contains("name: unit"));
        assert!(text.contains("algorithm: MinHop"));
        assert!(text.contains("route path [0, 5]"));
        assert!(text.contains("latency: 3.250000"));

        let csv = fs::read_to_string(dir.path().join("report [unit] MinHop.csv")).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("src,dst,latency_ms,failure_rate"));
        assert_eq!(lines.next(), Some("0,5,3.250000,0.000000"));
    }

    #[test]
    fn rib_rows_are_space_separated() {
        let dir = tempdir().unwrap();
        write_rib_row(dir.path(), "MinHop", 3, 7, &[0, 1, 2, 4]).unwrap();

        let contents =
            fs::read_to_string(dir.path().join("rib/MinHop/3/7.txt")).unwrap();
        assert_eq!(contents, "0 1 2 4\n");
    }
}
