// src/models/stats_models.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::matching::{FallbackStrategy, MatchResult, MatchType};
use crate::utils::constants::MANUAL_REVIEW_CONFIDENCE;

/// Benchmark outcome for one fallback strategy over a test corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackTestResult {
    pub strategy: FallbackStrategy,
    /// Percentage of cases that ended with a college, 0-100.
    pub match_rate: f64,
    /// Mean wall-clock time per case, in milliseconds.
    pub average_time_ms: f64,
    pub successes: usize,
    pub total_tests: usize,
    pub hierarchical_successes: usize,
    pub fallback_successes: usize,
    /// Cases that carried an expected college id.
    pub labeled_cases: usize,
    /// Labeled cases matched to exactly the expected college.
    pub correct_matches: usize,
    /// `correct_matches / labeled_cases` as a percentage; absent without labels.
    pub accuracy: Option<f64>,
}

impl FallbackTestResult {
    pub fn failures(&self) -> usize {
        self.total_tests - self.successes
    }
}

/// Summary of a batch of match results, as handed to the import pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchRunStats {
    pub total: usize,
    pub hierarchical_successes: usize,
    pub fallback_successes: usize,
    pub unmatched: usize,
    /// Mean confidence over matched records only.
    pub avg_confidence: f64,
    pub method_counts: BTreeMap<String, usize>,
    /// Positions (in the input batch) of results that need a human decision.
    pub manual_review_indices: Vec<usize>,
}

impl MatchRunStats {
    pub fn from_results(results: &[MatchResult]) -> Self {
        let mut stats = MatchRunStats {
            total: results.len(),
            ..Default::default()
        };
        let mut confidence_sum = 0.0;

        for (idx, result) in results.iter().enumerate() {
            match result.match_type {
                MatchType::HierarchicalSuccess => stats.hierarchical_successes += 1,
                MatchType::EnhancedFallback => stats.fallback_successes += 1,
                MatchType::Unmatched => stats.unmatched += 1,
            }
            if result.is_matched() {
                confidence_sum += result.confidence;
            }
            *stats.method_counts.entry(result.method.clone()).or_insert(0) += 1;
            if needs_manual_review(result) {
                stats.manual_review_indices.push(idx);
            }
        }

        let matched = stats.hierarchical_successes + stats.fallback_successes;
        if matched > 0 {
            stats.avg_confidence = confidence_sum / matched as f64;
        }
        stats
    }

    pub fn match_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.hierarchical_successes + self.fallback_successes) as f64 / self.total as f64 * 100.0
    }
}

/// Unmatched records and low-confidence fallback matches go to manual review.
pub fn needs_manual_review(result: &MatchResult) -> bool {
    match result.match_type {
        MatchType::Unmatched => true,
        MatchType::EnhancedFallback => result.confidence < MANUAL_REVIEW_CONFIDENCE,
        MatchType::HierarchicalSuccess => false,
    }
}
