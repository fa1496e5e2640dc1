// src/models/matching.rs
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::models::college::CanonicalCollege;

/// Diagnostic strings written into `MatchResult::method` when a stage or a
/// strategy gives up. Downstream review tooling filters on these verbatim.
pub mod diagnostics {
    pub const EMPTY_COLLEGE_NAME: &str = "empty_college_name";
    pub const NO_STATE_CANDIDATES: &str = "no_state_candidates";
    pub const EXACT_NAME_MATCH: &str = "exact_name_match";
    pub const LOCATION_DISAMBIGUATION: &str = "location_disambiguation";
    pub const HIERARCHICAL_FUZZY_FALLBACK: &str = "hierarchical_fuzzy_fallback";
    pub const HIERARCHICAL_ALGORITHM_FAILED: &str = "hierarchical_algorithm_failed";
}

/// One raw row from a seat-allocation or counselling sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRequest {
    /// Free text; anything after the first comma is treated as address noise.
    pub raw_college_name: String,
    pub raw_state: String,
}

impl MatchRequest {
    pub fn new(raw_college_name: impl Into<String>, raw_state: impl Into<String>) -> Self {
        Self {
            raw_college_name: raw_college_name.into(),
            raw_state: raw_state.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchType {
    HierarchicalSuccess,
    EnhancedFallback,
    Unmatched,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::HierarchicalSuccess => "HIERARCHICAL_SUCCESS",
            MatchType::EnhancedFallback => "ENHANCED_FALLBACK",
            MatchType::Unmatched => "UNMATCHED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlgorithmUsed {
    Hierarchical,
    SeriesFallback,
    SequentialFallback,
    ParallelFallback,
}

/// The three interchangeable secondary strategies. Exactly one runs per
/// request, chosen by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackStrategy {
    Series,
    Sequential,
    Parallel,
}

impl FallbackStrategy {
    pub const ALL: [FallbackStrategy; 3] = [
        FallbackStrategy::Series,
        FallbackStrategy::Sequential,
        FallbackStrategy::Parallel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackStrategy::Series => "series",
            FallbackStrategy::Sequential => "sequential",
            FallbackStrategy::Parallel => "parallel",
        }
    }

    pub fn algorithm(&self) -> AlgorithmUsed {
        match self {
            FallbackStrategy::Series => AlgorithmUsed::SeriesFallback,
            FallbackStrategy::Sequential => AlgorithmUsed::SequentialFallback,
            FallbackStrategy::Parallel => AlgorithmUsed::ParallelFallback,
        }
    }

    /// `<strategy>_fallback_failed`
    pub fn failure_diagnostic(&self) -> String {
        format!("{}_fallback_failed", self.as_str())
    }
}

impl fmt::Display for FallbackStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FallbackStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "series" => Ok(FallbackStrategy::Series),
            "sequential" => Ok(FallbackStrategy::Sequential),
            "parallel" => Ok(FallbackStrategy::Parallel),
            other => Err(anyhow::anyhow!(
                "Unknown fallback strategy '{}': expected series, sequential or parallel",
                other
            )),
        }
    }
}

/// The fallback technique that produced an enhanced match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackMethod {
    FuzzySearch,
    Abbreviation,
    TypoCorrection,
}

impl FallbackMethod {
    /// Tie-break order for the parallel strategy, highest priority first.
    pub const PRIORITY: [FallbackMethod; 3] = [
        FallbackMethod::FuzzySearch,
        FallbackMethod::Abbreviation,
        FallbackMethod::TypoCorrection,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackMethod::FuzzySearch => "fuzzy_search",
            FallbackMethod::Abbreviation => "abbreviation",
            FallbackMethod::TypoCorrection => "typo_correction",
        }
    }
}

/// Internal failure signal of a stage or strategy. Only the top-level matcher
/// turns it into an `UNMATCHED` result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchFailure {
    pub diagnostic: String,
    pub step: u8,
    pub algorithm: AlgorithmUsed,
}

impl MatchFailure {
    pub fn new(diagnostic: impl Into<String>, step: u8, algorithm: AlgorithmUsed) -> Self {
        Self {
            diagnostic: diagnostic.into(),
            step,
            algorithm,
        }
    }
}

/// Outcome of matching one request. Always produced, never an error.
///
/// Invariants: `Unmatched` results carry no college and a confidence of 0.0;
/// a present college always carries a confidence above zero. The constructors
/// below uphold both.
#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    pub college: Option<Arc<CanonicalCollege>>,
    pub match_type: MatchType,
    pub confidence: f64,
    pub method: String,
    pub algorithm_used: AlgorithmUsed,
    pub step: u8,
    #[serde(rename = "processing_time_ms", serialize_with = "serialize_duration_ms")]
    pub processing_time: Duration,
    pub fallback_method: Option<FallbackMethod>,
    /// Every diagnostic produced on the way to this decision, oldest first.
    /// The last entry always equals `method`.
    pub audit_trail: Vec<String>,
}

impl MatchResult {
    pub fn hierarchical(
        college: Arc<CanonicalCollege>,
        confidence: f64,
        method: &str,
        step: u8,
    ) -> Self {
        Self::matched(
            college,
            MatchType::HierarchicalSuccess,
            confidence,
            method.to_string(),
            AlgorithmUsed::Hierarchical,
            step,
            None,
        )
    }

    pub fn fallback(
        college: Arc<CanonicalCollege>,
        confidence: f64,
        method: String,
        strategy: FallbackStrategy,
        step: u8,
        fallback_method: FallbackMethod,
    ) -> Self {
        Self::matched(
            college,
            MatchType::EnhancedFallback,
            confidence,
            method,
            strategy.algorithm(),
            step,
            Some(fallback_method),
        )
    }

    fn matched(
        college: Arc<CanonicalCollege>,
        match_type: MatchType,
        confidence: f64,
        method: String,
        algorithm_used: AlgorithmUsed,
        step: u8,
        fallback_method: Option<FallbackMethod>,
    ) -> Self {
        debug_assert!(confidence > 0.0 && confidence <= 1.0);
        Self {
            college: Some(college),
            match_type,
            confidence,
            audit_trail: vec![method.clone()],
            method,
            algorithm_used,
            step,
            processing_time: Duration::ZERO,
            fallback_method,
        }
    }

    pub fn unmatched(failure: MatchFailure) -> Self {
        Self {
            college: None,
            match_type: MatchType::Unmatched,
            confidence: 0.0,
            audit_trail: vec![failure.diagnostic.clone()],
            method: failure.diagnostic,
            algorithm_used: failure.algorithm,
            step: failure.step,
            processing_time: Duration::ZERO,
            fallback_method: None,
        }
    }

    /// Prepends diagnostics from earlier, failed phases to the audit trail.
    pub fn with_prior_diagnostics(mut self, prior: &[String]) -> Self {
        let mut trail = prior.to_vec();
        trail.append(&mut self.audit_trail);
        self.audit_trail = trail;
        self
    }

    pub fn with_processing_time(mut self, elapsed: Duration) -> Self {
        self.processing_time = elapsed;
        self
    }

    pub fn is_matched(&self) -> bool {
        self.college.is_some()
    }

    pub fn college_id(&self) -> Option<&str> {
        self.college.as_deref().map(|c| c.id.as_str())
    }
}

/// Equality covers every field except `processing_time`, which is wall clock.
impl PartialEq for MatchResult {
    fn eq(&self, other: &Self) -> bool {
        self.college == other.college
            && self.match_type == other.match_type
            && self.confidence == other.confidence
            && self.method == other.method
            && self.algorithm_used == other.algorithm_used
            && self.step == other.step
            && self.fallback_method == other.fallback_method
            && self.audit_trail == other.audit_trail
    }
}

fn serialize_duration_ms<S: Serializer>(
    duration: &Duration,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64() * 1000.0)
}
