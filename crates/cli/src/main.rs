mod cli;
mod config;
mod report;
mod verify;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::Parser;
use tracing::{info, warn};

use chunkbench_compute::run_experiment;
use chunkbench_core::generate;

use crate::cli::CliArgs;
use crate::report::RunSummary;

fn main() -> Result<()> {
    chunkbench_core::load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    let config = config::resolve(&args)?;
    config.log_summary();

    let kind = args.dataset_kind();
    let policy = args.policy();
    let started_at = Utc::now();

    let dataset = generate(kind, &config).context("failed to generate dataset")?;
    info!(
        %kind,
        chunks = dataset.len(),
        heavy = dataset.heavy_count(),
        "dataset ready"
    );

    let report = run_experiment(&config, policy, &dataset).context("experiment failed")?;
    report.log_summary();
    for anomaly in report.anomalies() {
        warn!(
            chunk = anomaly.chunk,
            worker = anomaly.worker,
            idle_secs = anomaly.idle_secs,
            "worker busy time exceeds chunk wall time"
        );
    }

    let verified = if args.verify {
        Some(verify::check(&config, &dataset, report.final_result)?)
    } else {
        None
    };

    if !args.no_csv {
        report::write_csv_file(&args.output, &report)?;
        info!(path = %args.output.display(), "timings written");
    }

    if let Some(path) = &args.summary {
        let mut summary = RunSummary::new(started_at, kind, config.chunk_size, &report);
        summary.verified = verified;
        summary.write_to(path)?;
        info!(path = %path.display(), "summary written");
    }

    println!("policy:       {policy}");
    println!("dataset:      {kind}");
    println!("final result: {}", report.final_result);
    println!("total time:   {:.4}s", report.total_time.as_secs_f64());

    if verified == Some(false) {
        bail!("verification failed: pool, coordinator and reference sums differ");
    }
    Ok(())
}
