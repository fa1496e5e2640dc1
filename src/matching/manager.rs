// src/matching/manager.rs - Top-level matcher: hierarchical first, one fallback strategy after
use anyhow::{Context, Result};
use indicatif::ProgressBar;
use log::{debug, info};
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;

use crate::matching::fallback::FallbackOrchestrator;
use crate::matching::hierarchical::HierarchicalMatcher;
use crate::matching::index::IndexSet;
use crate::matching::normalize::TextNormalizer;
use crate::matching::registry::load_registry;
use crate::models::college::CanonicalCollege;
use crate::models::matching::{FallbackStrategy, MatchRequest, MatchResult};
use crate::utils::config::MatcherConfig;
use crate::utils::corrections::CorrectionTables;

/// Matches raw college names against one registry snapshot.
///
/// Everything inside is immutable after construction, so a single matcher can
/// be shared across any number of threads.
pub struct CollegeMatcher {
    index: Arc<IndexSet>,
    normalizer: Arc<TextNormalizer>,
    hierarchical: HierarchicalMatcher,
    fallback: FallbackOrchestrator,
    strategy: FallbackStrategy,
}

impl CollegeMatcher {
    pub fn new(
        registry: Vec<CanonicalCollege>,
        tables: CorrectionTables,
        strategy: FallbackStrategy,
    ) -> Result<Self> {
        let normalizer = Arc::new(
            TextNormalizer::new(Arc::new(tables)).context("Failed to prepare correction tables")?,
        );
        let index = Arc::new(IndexSet::build(registry));
        info!(
            "College matcher ready: {} colleges, correction tables {}, {} fallback",
            index.len(),
            normalizer.tables().version,
            strategy
        );
        Ok(Self {
            hierarchical: HierarchicalMatcher::new(Arc::clone(&index), Arc::clone(&normalizer)),
            fallback: FallbackOrchestrator::new(Arc::clone(&index), Arc::clone(&normalizer)),
            index,
            normalizer,
            strategy,
        })
    }

    /// Loads the registry and correction tables named by `config`. Any load
    /// or validation failure is fatal.
    pub fn from_config(config: &MatcherConfig) -> Result<Self> {
        let registry = load_registry(&config.registry_path)?;
        let tables = CorrectionTables::load(config.correction_tables_path.as_deref())?;
        Self::new(registry, tables, config.fallback_strategy)
    }

    pub fn strategy(&self) -> FallbackStrategy {
        self.strategy
    }

    pub fn index(&self) -> &IndexSet {
        &self.index
    }

    pub fn tables_version(&self) -> &str {
        &self.normalizer.tables().version
    }

    /// Matches with the configured fallback strategy. Never fails; every
    /// input, empty strings included, yields a well-formed result.
    pub fn match_college(&self, raw_name: &str, raw_state: &str) -> MatchResult {
        self.match_with_strategy(raw_name, raw_state, self.strategy)
    }

    pub fn match_request(&self, request: &MatchRequest) -> MatchResult {
        self.match_college(&request.raw_college_name, &request.raw_state)
    }

    pub fn match_with_strategy(
        &self,
        raw_name: &str,
        raw_state: &str,
        strategy: FallbackStrategy,
    ) -> MatchResult {
        let start = Instant::now();

        let result = match self.hierarchical.prepare(raw_name, raw_state) {
            // empty names and unknown states leave nothing for a fallback to search
            Err(failure) => MatchResult::unmatched(failure),
            Ok(ctx) => match self.hierarchical.match_prepared(&ctx) {
                Ok(result) => result,
                Err(primary) => {
                    let prior = [primary.diagnostic];
                    match self.fallback.run(strategy, &ctx) {
                        Ok(result) => result.with_prior_diagnostics(&prior),
                        Err(failure) => {
                            MatchResult::unmatched(failure).with_prior_diagnostics(&prior)
                        }
                    }
                }
            },
        };

        debug!(
            "'{}' / '{}' -> {} via {} (confidence {:.3}, step {})",
            raw_name,
            raw_state,
            result.college_id().unwrap_or("-"),
            result.method,
            result.confidence,
            result.step
        );
        result.with_processing_time(start.elapsed())
    }

    /// Matches every request on the current rayon pool. Output order follows
    /// input order.
    pub fn match_batch(
        &self,
        requests: &[MatchRequest],
        progress: Option<&ProgressBar>,
    ) -> Vec<MatchResult> {
        requests
            .par_iter()
            .map(|request| {
                let result = self.match_request(request);
                if let Some(pb) = progress {
                    pb.inc(1);
                }
                result
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::matching::{AlgorithmUsed, FallbackMethod, MatchType};

    fn college(id: &str, name: &str, state: &str) -> CanonicalCollege {
        CanonicalCollege {
            id: id.to_string(),
            name: name.to_string(),
            previous_name: None,
            address: None,
            state: state.to_string(),
            college_type: "MEDICAL".to_string(),
            management: None,
            university: None,
        }
    }

    fn matcher(strategy: FallbackStrategy) -> CollegeMatcher {
        CollegeMatcher::new(
            vec![
                college("R1", "SAWAI MAN SINGH MEDICAL COLLEGE", "RAJASTHAN"),
                college("D1", "VARDHMAN MAHAVIR MEDICAL COLLEGE", "NEW DELHI"),
            ],
            CorrectionTables::builtin(),
            strategy,
        )
        .unwrap()
    }

    #[test]
    fn test_fallback_result_keeps_audit_trail() {
        let m = matcher(FallbackStrategy::Series);
        let result = m.match_college("SMS MEDICAL COLLEGE, JAIPUR", "Rajasthan");
        assert_eq!(result.match_type, MatchType::EnhancedFallback);
        assert_eq!(result.fallback_method, Some(FallbackMethod::Abbreviation));
        assert_eq!(
            result.audit_trail,
            vec![
                "hierarchical_algorithm_failed".to_string(),
                "series_fallback_abbreviation".to_string()
            ]
        );
    }

    #[test]
    fn test_unmatched_after_fallback() {
        let m = matcher(FallbackStrategy::Parallel);
        let result = m.match_college("ARMED FORCES MEDICAL COLLEGE", "RAJASTHAN");
        assert_eq!(result.match_type, MatchType::Unmatched);
        assert_eq!(result.method, "parallel_fallback_failed");
        assert_eq!(result.algorithm_used, AlgorithmUsed::ParallelFallback);
        assert_eq!(result.step, 4);
        assert!(result.college.is_none());
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_no_state_skips_fallback() {
        let m = matcher(FallbackStrategy::Sequential);
        let result = m.match_college("SMS MEDICAL COLLEGE", "NOWHERESTATE");
        assert_eq!(result.method, "no_state_candidates");
        assert_eq!(result.algorithm_used, AlgorithmUsed::Hierarchical);
        assert_eq!(result.audit_trail.len(), 1);
    }

    #[test]
    fn test_batch_preserves_order() {
        let m = matcher(FallbackStrategy::Series);
        let requests = vec![
            MatchRequest::new("VARDHAMAN MAHAVIR MEDICAL COLLEGE", "NEW DELHI"),
            MatchRequest::new("", ""),
            MatchRequest::new("SAWAI MAN SINGH MEDICAL COLLEGE", "RAJASTHAN"),
        ];
        let results = m.match_batch(&requests, None);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].college_id(), Some("D1"));
        assert_eq!(results[1].match_type, MatchType::Unmatched);
        assert_eq!(results[2].college_id(), Some("R1"));
        for (request, result) in requests.iter().zip(&results) {
            assert_eq!(&m.match_request(request), result);
        }
    }
}
