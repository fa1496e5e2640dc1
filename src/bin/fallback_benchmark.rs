// src/bin/fallback_benchmark.rs
//
// Runs a corpus of raw college names through the matcher once per fallback
// strategy and prints the strategies ranked by match rate, then speed.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use indicatif::{MultiProgress, ProgressBar};
use log::info;
use matcher_lib::matching::benchmark::{
    load_benchmark_cases, rank_strategies, run_strategy, sample_cases,
};
use matcher_lib::matching::manager::CollegeMatcher;
use matcher_lib::models::matching::FallbackStrategy;
use matcher_lib::models::stats_models::FallbackTestResult;
use matcher_lib::utils::config::MatcherConfig;
use matcher_lib::utils::get_memory_usage;
use matcher_lib::utils::progress_bars::logging::{log_ranking, MatchingLogger, RunPhase};
use matcher_lib::utils::progress_bars::progress_config::ProgressConfig;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use uuid::Uuid;

const DEFAULT_SAMPLE_SEED: u64 = 42;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct BenchmarkArgs {
    /// JSON array of cases: raw_college_name, raw_state, optional expected_college_id
    cases: PathBuf,

    /// Registry JSON (overrides COLLEGE_REGISTRY_PATH)
    #[arg(long)]
    registry: Option<PathBuf>,

    /// Correction tables JSON (overrides CORRECTION_TABLES_PATH)
    #[arg(long)]
    corrections: Option<PathBuf>,

    /// Only run a random subset of this many cases
    #[arg(long)]
    sample: Option<usize>,

    /// Seed for --sample
    #[arg(long, default_value_t = DEFAULT_SAMPLE_SEED)]
    seed: u64,

    /// Write the ranked results as JSON
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Serialize)]
struct BenchmarkReport {
    run_id: String,
    generated_at: DateTime<Utc>,
    correction_tables_version: String,
    total_cases: usize,
    best_strategy: Option<FallbackStrategy>,
    ranked: Vec<FallbackTestResult>,
}

fn main() -> Result<()> {
    matcher_lib::utils::env::load_env();
    env_logger::init();
    let args = BenchmarkArgs::parse();

    let mut config = MatcherConfig::from_env();
    if let Some(registry) = args.registry {
        config.registry_path = registry;
    }
    if let Some(corrections) = args.corrections {
        config.correction_tables_path = Some(corrections);
    }

    let run_id = Uuid::new_v4().to_string();
    let generated_at = Utc::now();
    let progress_config = ProgressConfig::from_env();
    let logger = MatchingLogger::for_phase(RunPhase::Benchmark);
    logger.log_start(&run_id, &format!("started at {}", generated_at.to_rfc3339()));

    let matcher = CollegeMatcher::from_config(&config)?;
    let mut cases = load_benchmark_cases(&args.cases)?;
    if cases.is_empty() {
        bail!("No benchmark cases in {}", args.cases.display());
    }
    if let Some(size) = args.sample {
        if size >= cases.len() {
            logger.log_warning(&format!(
                "--sample {} covers all {} cases; running the full corpus",
                size,
                cases.len()
            ));
        }
        cases = sample_cases(&cases, size, args.seed);
        let detail = format!("{} cases (seed {})", cases.len(), args.seed);
        logger.log_phase("Sampling", Some(&detail));
    }
    logger.log_data_loaded(cases.len(), "benchmark cases");

    let multi = progress_config.create_multi_progress();
    let pb = progress_config
        .create_bar(FallbackStrategy::ALL.len() as u64, "Benchmarking strategies...")
        .map(|pb| attach(multi.as_ref(), pb));
    let mut results = Vec::with_capacity(FallbackStrategy::ALL.len());
    for strategy in FallbackStrategy::ALL {
        let strategy_logger = MatchingLogger::for_strategy(strategy);
        strategy_logger.log_phase("Running", Some(&format!("{} cases", cases.len())));
        let strategy_pb = multi.as_ref().and_then(|m| {
            progress_config
                .create_bar(cases.len() as u64, &format!("{} fallback", strategy))
                .map(|pb| m.add(pb))
        });
        let result = run_strategy(&matcher, &cases, strategy, strategy_pb.as_ref());
        if let Some(strategy_pb) = &strategy_pb {
            strategy_pb.finish_and_clear();
        }
        strategy_logger.log_strategy_result(&result);
        if progress_config.should_show_memory() {
            strategy_logger.log_debug(&format!("memory in use: {} MB", get_memory_usage()));
        }
        results.push(result);
        if let Some(pb) = &pb {
            pb.inc(1);
        }
    }
    if let Some(pb) = &pb {
        pb.finish_with_message("Benchmark complete");
    }

    let ranked = rank_strategies(&results);
    log_ranking(&ranked);
    let best_strategy = ranked.first().map(|r| r.strategy);
    if let Some(best) = best_strategy {
        info!("🥇 Recommended fallback strategy: {} (FALLBACK_STRATEGY={})", best, best);
    }
    info!(
        "⏱️  Benchmark finished in {:.2?}, {} MB in use",
        logger.get_elapsed(),
        get_memory_usage()
    );

    if let Some(path) = args.output {
        let report = BenchmarkReport {
            run_id,
            generated_at,
            correction_tables_version: matcher.tables_version().to_string(),
            total_cases: cases.len(),
            best_strategy,
            ranked,
        };
        let file = File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &report)
            .context("Failed to write benchmark report")?;
        info!("📝 Benchmark report written to {}", path.display());
    }
    Ok(())
}

fn attach(multi: Option<&MultiProgress>, pb: ProgressBar) -> ProgressBar {
    match multi {
        Some(multi) => multi.add(pb),
        None => pb,
    }
}
