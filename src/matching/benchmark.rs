// src/matching/benchmark.rs - Side-by-side comparison of the fallback strategies
use anyhow::{Context, Result};
use indicatif::ProgressBar;
use log::info;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use crate::matching::manager::CollegeMatcher;
use crate::models::matching::{FallbackStrategy, MatchRequest, MatchType};
use crate::models::stats_models::FallbackTestResult;
use crate::utils::progress_bars::logging::MatchingLogger;

/// One benchmark input, optionally labeled with the college it should match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkCase {
    #[serde(flatten)]
    pub request: MatchRequest,
    #[serde(default)]
    pub expected_college_id: Option<String>,
}

impl BenchmarkCase {
    pub fn new(raw_college_name: &str, raw_state: &str) -> Self {
        Self {
            request: MatchRequest::new(raw_college_name, raw_state),
            expected_college_id: None,
        }
    }

    pub fn labeled(raw_college_name: &str, raw_state: &str, expected_college_id: &str) -> Self {
        Self {
            expected_college_id: Some(expected_college_id.to_string()),
            ..Self::new(raw_college_name, raw_state)
        }
    }
}

/// Runs every case through the hierarchical matcher and, where it fails,
/// through each strategy in turn. One result per strategy.
pub fn test_fallback_approaches(
    matcher: &CollegeMatcher,
    cases: &[BenchmarkCase],
) -> Vec<FallbackTestResult> {
    FallbackStrategy::ALL
        .iter()
        .map(|&strategy| run_strategy(matcher, cases, strategy, None))
        .collect()
}

/// Cases run one at a time so the per-case timing is not skewed by contention.
pub fn run_strategy(
    matcher: &CollegeMatcher,
    cases: &[BenchmarkCase],
    strategy: FallbackStrategy,
    progress: Option<&ProgressBar>,
) -> FallbackTestResult {
    let logger = MatchingLogger::for_strategy(strategy);
    let mut hierarchical_successes = 0;
    let mut fallback_successes = 0;
    let mut labeled_cases = 0;
    let mut correct_matches = 0;
    let mut total_time = Duration::ZERO;

    for (done, case) in cases.iter().enumerate() {
        let start = Instant::now();
        let result = matcher.match_with_strategy(
            &case.request.raw_college_name,
            &case.request.raw_state,
            strategy,
        );
        total_time += start.elapsed();

        match result.match_type {
            MatchType::HierarchicalSuccess => hierarchical_successes += 1,
            MatchType::EnhancedFallback => fallback_successes += 1,
            MatchType::Unmatched => {}
        }
        if let Some(expected) = &case.expected_college_id {
            labeled_cases += 1;
            if result.college_id() == Some(expected.as_str()) {
                correct_matches += 1;
            }
        }
        if let Some(pb) = progress {
            pb.inc(1);
        }
        logger.log_progress_update(done + 1, cases.len(), None);
    }

    let total_tests = cases.len();
    let successes = hierarchical_successes + fallback_successes;
    let (match_rate, average_time_ms) = if total_tests > 0 {
        (
            successes as f64 / total_tests as f64 * 100.0,
            total_time.as_secs_f64() * 1000.0 / total_tests as f64,
        )
    } else {
        (0.0, 0.0)
    };
    let accuracy =
        (labeled_cases > 0).then(|| correct_matches as f64 / labeled_cases as f64 * 100.0);

    FallbackTestResult {
        strategy,
        match_rate,
        average_time_ms,
        successes,
        total_tests,
        hierarchical_successes,
        fallback_successes,
        labeled_cases,
        correct_matches,
        accuracy,
    }
}

/// Highest match rate first; equal rates go to the faster strategy.
pub fn rank_strategies(results: &[FallbackTestResult]) -> Vec<FallbackTestResult> {
    let mut ranked = results.to_vec();
    ranked.sort_by(|a, b| {
        b.match_rate
            .total_cmp(&a.match_rate)
            .then_with(|| a.average_time_ms.total_cmp(&b.average_time_ms))
    });
    ranked
}

pub fn best_strategy(results: &[FallbackTestResult]) -> Option<FallbackStrategy> {
    rank_strategies(results).first().map(|r| r.strategy)
}

pub fn load_benchmark_cases(path: &Path) -> Result<Vec<BenchmarkCase>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read benchmark cases from {}", path.display()))?;
    let cases: Vec<BenchmarkCase> = serde_json::from_str(&raw)
        .with_context(|| {
            format!("Benchmark file {} is not a JSON array of cases", path.display())
        })?;
    let labeled = cases.iter().filter(|c| c.expected_college_id.is_some()).count();
    info!("Loaded {} benchmark cases ({} labeled)", cases.len(), labeled);
    Ok(cases)
}

/// A reproducible random subset of at most `size` cases.
pub fn sample_cases(cases: &[BenchmarkCase], size: usize, seed: u64) -> Vec<BenchmarkCase> {
    if size >= cases.len() {
        return cases.to_vec();
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut sampled = cases.to_vec();
    sampled.shuffle(&mut rng);
    sampled.truncate(size);
    sampled
}
