// src/main.rs - Batch college matcher
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use log::info;
use matcher_lib::matching::manager::CollegeMatcher;
use matcher_lib::models::matching::{FallbackStrategy, MatchRequest, MatchResult};
use matcher_lib::models::stats_models::MatchRunStats;
use matcher_lib::utils::config::MatcherConfig;
use matcher_lib::utils::env::load_env;
use matcher_lib::utils::get_memory_usage;
use matcher_lib::utils::progress_bars::logging::{MatchingLogger, RunPhase};
use matcher_lib::utils::progress_bars::progress_config::ProgressConfig;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Match raw college names against the canonical registry",
    long_about = None
)]
struct Args {
    /// JSON array of {"raw_college_name", "raw_state"} requests
    input: PathBuf,

    /// Write results here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Registry JSON (overrides COLLEGE_REGISTRY_PATH)
    #[arg(long)]
    registry: Option<PathBuf>,

    /// Correction tables JSON (overrides CORRECTION_TABLES_PATH)
    #[arg(long)]
    corrections: Option<PathBuf>,

    /// series, sequential or parallel (overrides FALLBACK_STRATEGY)
    #[arg(long)]
    strategy: Option<String>,

    /// Worker threads (overrides MATCHER_THREADS)
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(Serialize)]
struct MatchedRecord<'a> {
    #[serde(flatten)]
    request: &'a MatchRequest,
    result: &'a MatchResult,
}

#[derive(Serialize)]
struct MatchReport<'a> {
    run_id: &'a str,
    generated_at: DateTime<Utc>,
    strategy: FallbackStrategy,
    correction_tables_version: &'a str,
    stats: &'a MatchRunStats,
    records: Vec<MatchedRecord<'a>>,
}

fn main() -> Result<()> {
    load_env();
    env_logger::init();
    let args = Args::parse();

    let mut config = MatcherConfig::from_env();
    if let Some(registry) = args.registry {
        config.registry_path = registry;
    }
    if let Some(corrections) = args.corrections {
        config.correction_tables_path = Some(corrections);
    }
    if let Some(strategy) = args.strategy.as_deref() {
        config.fallback_strategy = strategy.parse().context("Invalid --strategy")?;
    }
    if let Some(threads) = args.threads.filter(|&n| n > 0) {
        config.threads = threads;
    }
    config.log_config();

    rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build_global()
        .context("Failed to configure the worker pool")?;

    let progress_config = ProgressConfig::from_env();
    let run_id = Uuid::new_v4().to_string();

    let registry_logger = MatchingLogger::for_phase(RunPhase::Registry);
    registry_logger.log_start(&run_id, "loading registry and correction tables");
    let matcher = CollegeMatcher::from_config(&config)?;
    registry_logger.log_data_loaded(matcher.index().len(), "canonical colleges");

    let requests = load_requests(&args.input)?;
    let batch_logger = MatchingLogger::for_phase(RunPhase::Batch);
    batch_logger.log_start(&run_id, &format!("{} fallback", matcher.strategy()));
    batch_logger.log_data_loaded(requests.len(), "match requests");
    if requests.is_empty() {
        batch_logger.log_warning("input contains no match requests; writing an empty report");
    }

    let pb = progress_config.create_bar(requests.len() as u64, "Matching colleges...");
    let results = matcher.match_batch(&requests, pb.as_ref());
    if let Some(pb) = &pb {
        pb.finish_with_message(format!("Matched {} records", results.len()));
    }

    let stats = MatchRunStats::from_results(&results);
    batch_logger.log_run_stats(&stats);
    if progress_config.should_show_memory() {
        info!("💾 Memory in use: {} MB", get_memory_usage());
    }

    let report = MatchReport {
        run_id: &run_id,
        generated_at: Utc::now(),
        strategy: matcher.strategy(),
        correction_tables_version: matcher.tables_version(),
        stats: &stats,
        records: requests
            .iter()
            .zip(&results)
            .map(|(request, result)| MatchedRecord { request, result })
            .collect(),
    };
    write_report(&report, args.output.as_deref())?;
    Ok(())
}

fn load_requests(path: &Path) -> Result<Vec<MatchRequest>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read match requests from {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of match requests", path.display()))
}

fn write_report(report: &MatchReport<'_>, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, report)
                .context("Failed to write match report")?;
            writer.flush().context("Failed to flush match report")?;
            info!("📝 Wrote {} results to {}", report.records.len(), path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            serde_json::to_writer_pretty(&mut lock, report)
                .context("Failed to write match report")?;
            writeln!(lock).context("Failed to write match report")?;
        }
    }
    Ok(())
}
