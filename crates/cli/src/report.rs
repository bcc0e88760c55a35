//! CSV timing table and JSON run summary.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use chunkbench_compute::{ExperimentReport, Policy};
use chunkbench_core::DatasetKind;
use serde::Serialize;

/// Write one row per chunk: `work, idle, heavy` for every worker followed
/// by the chunk wall time, summed idle time and summed heavy count.
pub fn write_csv<W: Write>(report: &ExperimentReport, mut out: W) -> io::Result<()> {
    for i in 0..report.worker_count {
        write!(out, " work_{i}, idle_{i}, heavy_{i},")?;
    }
    writeln!(out, " chunk_time, total_idle, total_heavy")?;

    for chunk in &report.chunks {
        for (i, worker) in chunk.workers.iter().enumerate() {
            write!(
                out,
                "{:.6}, {:.6}, {},",
                worker.busy.as_secs_f64(),
                chunk.idle_secs(i),
                worker.heavy
            )?;
        }
        writeln!(
            out,
            "{:.6}, {:.6}, {}",
            chunk.wall.as_secs_f64(),
            chunk.total_idle_secs(),
            chunk.total_heavy()
        )?;
    }
    out.flush()
}

pub fn write_csv_file(path: &Path, report: &ExperimentReport) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    write_csv(report, BufWriter::new(file))
        .with_context(|| format!("failed to write timings to {}", path.display()))
}

/// Machine-readable outcome of one run.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub policy: Policy,
    pub dataset: DatasetKind,
    pub worker_count: usize,
    pub chunk_count: usize,
    pub chunk_size: usize,
    pub final_result: u64,
    pub total_secs: f64,
    pub total_idle_secs: f64,
    pub total_heavy: usize,
    pub anomalies: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
}

impl RunSummary {
    pub fn new(
        started_at: DateTime<Utc>,
        dataset: DatasetKind,
        chunk_size: usize,
        report: &ExperimentReport,
    ) -> Self {
        Self {
            started_at,
            policy: report.policy,
            dataset,
            worker_count: report.worker_count,
            chunk_count: report.chunks.len(),
            chunk_size,
            final_result: report.final_result,
            total_secs: report.total_time.as_secs_f64(),
            total_idle_secs: report.total_idle_secs(),
            total_heavy: report.total_heavy(),
            anomalies: report.anomalies().len(),
            verified: None,
        }
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        let mut out = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut out, self).context("failed to serialize run summary")?;
        writeln!(out)?;
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chunkbench_compute::{ChunkTiming, WorkerTiming};

    use super::*;

    fn report() -> ExperimentReport {
        let worker = |busy_ms, heavy| WorkerTiming {
            busy: Duration::from_millis(busy_ms),
            heavy,
            processed: 4,
        };
        ExperimentReport {
            policy: Policy::Static,
            worker_count: 2,
            chunks: vec![
                ChunkTiming {
                    index: 0,
                    wall: Duration::from_millis(500),
                    workers: vec![worker(500, 2), worker(250, 0)],
                },
                ChunkTiming {
                    index: 1,
                    wall: Duration::from_millis(1000),
                    workers: vec![worker(750, 1), worker(1000, 1)],
                },
            ],
            final_result: 1234,
            total_time: Duration::from_millis(1500),
        }
    }

    #[test]
    fn csv_layout_has_header_and_row_per_chunk() {
        let mut buf = Vec::new();
        write_csv(&report(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            " work_0, idle_0, heavy_0, work_1, idle_1, heavy_1, chunk_time, total_idle, total_heavy"
        );
        assert_eq!(
            lines[1],
            "0.500000, 0.000000, 2,0.250000, 0.250000, 0,0.500000, 0.250000, 2"
        );
        assert_eq!(
            lines[2],
            "0.750000, 0.250000, 1,1.000000, 0.000000, 1,1.000000, 0.250000, 2"
        );
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn csv_file_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("timings.csv");
        write_csv_file(&path, &report()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn summary_round_trips_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        let mut summary = RunSummary::new(Utc::now(), DatasetKind::Stacked, 4, &report());
        summary.verified = Some(true);
        summary.write_to(&path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["policy"], "static");
        assert_eq!(json["dataset"], "stacked");
        assert_eq!(json["chunk_count"], 2);
        assert_eq!(json["final_result"], 1234);
        assert_eq!(json["total_heavy"], 4);
        assert_eq!(json["anomalies"], 0);
        assert_eq!(json["verified"], true);
        assert!(json["started_at"].is_string());
    }
}
