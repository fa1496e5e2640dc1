// src/matching/fallback.rs - Secondary strategies run after the hierarchical pipeline fails
use log::{debug, warn};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::matching::hierarchical::MatchContext;
use crate::matching::index::IndexSet;
use crate::matching::normalize::{normalize, TextNormalizer};
use crate::models::matching::{FallbackMethod, FallbackStrategy, MatchFailure, MatchResult};
use crate::utils::constants::{
    ABBREVIATION_CONFIDENCE, FUZZY_SEARCH_THRESHOLD, MAX_FUZZY_CONFIDENCE,
    SEQUENTIAL_HIGH_THRESHOLD, SEQUENTIAL_LOW_THRESHOLD, SEQUENTIAL_MEDIUM_THRESHOLD,
    TYPO_CORRECTION_CONFIDENCE,
};

/// A single technique's answer: a registry position and its confidence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TechniqueHit {
    pub college_idx: usize,
    pub confidence: f64,
    pub method: FallbackMethod,
}

const SEQUENTIAL_FUZZY_LEVELS: [(f64, &str); 3] = [
    (SEQUENTIAL_HIGH_THRESHOLD, "high"),
    (SEQUENTIAL_MEDIUM_THRESHOLD, "medium"),
    (SEQUENTIAL_LOW_THRESHOLD, "low"),
];

pub struct FallbackOrchestrator {
    index: Arc<IndexSet>,
    normalizer: Arc<TextNormalizer>,
}

impl FallbackOrchestrator {
    pub fn new(index: Arc<IndexSet>, normalizer: Arc<TextNormalizer>) -> Self {
        Self { index, normalizer }
    }

    pub fn run(
        &self,
        strategy: FallbackStrategy,
        ctx: &MatchContext,
    ) -> Result<MatchResult, MatchFailure> {
        let outcome = match strategy {
            FallbackStrategy::Series => self.series(ctx),
            FallbackStrategy::Sequential => self.sequential(ctx),
            FallbackStrategy::Parallel => self.parallel(ctx),
        };
        outcome.ok_or_else(|| {
            MatchFailure::new(
                strategy.failure_diagnostic(),
                technique_count(strategy) + 1,
                strategy.algorithm(),
            )
        })
    }

    /// Runs one technique on its own, with the acceptance rule it has in the
    /// series and parallel strategies.
    pub fn technique(&self, method: FallbackMethod, ctx: &MatchContext) -> Option<TechniqueHit> {
        match method {
            FallbackMethod::FuzzySearch => self
                .fuzzy_search(ctx)
                .filter(|hit| hit.confidence >= FUZZY_SEARCH_THRESHOLD),
            FallbackMethod::Abbreviation => self.abbreviation_lookup(ctx),
            FallbackMethod::TypoCorrection => self.typo_lookup(ctx),
        }
    }

    /// Fuzzy-search, then abbreviation, then typo correction; first hit wins.
    fn series(&self, ctx: &MatchContext) -> Option<MatchResult> {
        FallbackMethod::PRIORITY
            .iter()
            .enumerate()
            .find_map(|(pos, &method)| {
                self.technique(method, ctx).map(|hit| {
                    self.to_result(FallbackStrategy::Series, hit, pos as u8 + 1, None)
                })
            })
    }

    /// One fuzzy search graded against falling thresholds (steps 1-3), then
    /// abbreviation (4) and typo correction (5).
    fn sequential(&self, ctx: &MatchContext) -> Option<MatchResult> {
        let strategy = FallbackStrategy::Sequential;
        if let Some(hit) = self.fuzzy_search(ctx) {
            for (level, (threshold, label)) in SEQUENTIAL_FUZZY_LEVELS.iter().enumerate() {
                if hit.confidence >= *threshold {
                    return Some(self.to_result(strategy, hit, level as u8 + 1, Some(*label)));
                }
            }
        }
        let tail = [FallbackMethod::Abbreviation, FallbackMethod::TypoCorrection];
        tail.iter().enumerate().find_map(|(pos, &method)| {
            self.technique(method, ctx).map(|hit| {
                let step = (SEQUENTIAL_FUZZY_LEVELS.len() + pos) as u8 + 1;
                self.to_result(strategy, hit, step, None)
            })
        })
    }

    /// All three techniques concurrently, resolved by `pick_parallel_winner`.
    fn parallel(&self, ctx: &MatchContext) -> Option<MatchResult> {
        let ((fuzzy, abbreviation), typo) = rayon::join(
            || {
                rayon::join(
                    || self.guarded(FallbackMethod::FuzzySearch, ctx),
                    || self.guarded(FallbackMethod::Abbreviation, ctx),
                )
            },
            || self.guarded(FallbackMethod::TypoCorrection, ctx),
        );

        pick_parallel_winner([fuzzy, abbreviation, typo])
            .map(|(step, hit)| self.to_result(FallbackStrategy::Parallel, hit, step, None))
    }

    /// A panicking technique counts as "no result" for that technique only.
    fn guarded(&self, method: FallbackMethod, ctx: &MatchContext) -> Option<TechniqueHit> {
        match panic::catch_unwind(AssertUnwindSafe(|| self.technique(method, ctx))) {
            Ok(hit) => hit,
            Err(_) => {
                warn!(
                    "Parallel fallback technique {} panicked for '{}'; treating as no result",
                    method.as_str(),
                    ctx.clean_name
                );
                None
            }
        }
    }

    /// Best approximate hit among the state candidates, no threshold applied.
    /// Confidence never exceeds `MAX_FUZZY_CONFIDENCE`.
    pub fn fuzzy_search(&self, ctx: &MatchContext) -> Option<TechniqueHit> {
        self.index
            .fuzzy()
            .best(&ctx.normalized_name, Some(&ctx.candidates.indices))
            .map(|hit| TechniqueHit {
                college_idx: hit.college_idx,
                confidence: hit.score.min(MAX_FUZZY_CONFIDENCE),
                method: FallbackMethod::FuzzySearch,
            })
    }

    /// Exact lookup of the abbreviation-expanded name. Only counts when the
    /// expansion actually changed something.
    pub fn abbreviation_lookup(&self, ctx: &MatchContext) -> Option<TechniqueHit> {
        let expanded = self.normalizer.expand_abbreviations(&ctx.normalized_name);
        if expanded == ctx.normalized_name {
            return None;
        }
        debug!("Abbreviation expansion: '{}' -> '{}'", ctx.normalized_name, expanded);
        self.lookup_in_state(&expanded, ctx).map(|college_idx| TechniqueHit {
            college_idx,
            confidence: ABBREVIATION_CONFIDENCE,
            method: FallbackMethod::Abbreviation,
        })
    }

    /// Exact lookup of the typo-corrected name, starting again from the
    /// uncorrected input.
    pub fn typo_lookup(&self, ctx: &MatchContext) -> Option<TechniqueHit> {
        let corrected = self.normalizer.correct_typos(&normalize(&ctx.clean_name));
        self.lookup_in_state(&corrected, ctx).map(|college_idx| TechniqueHit {
            college_idx,
            confidence: TYPO_CORRECTION_CONFIDENCE,
            method: FallbackMethod::TypoCorrection,
        })
    }

    fn lookup_in_state(&self, normalized_name: &str, ctx: &MatchContext) -> Option<usize> {
        ctx.candidates
            .state_keys
            .iter()
            .find_map(|state_key| self.index.normalized_lookup(normalized_name, state_key))
    }

    fn to_result(
        &self,
        strategy: FallbackStrategy,
        hit: TechniqueHit,
        step: u8,
        level: Option<&str>,
    ) -> MatchResult {
        let method = match level {
            Some(level) => format!(
                "{}_fallback_{}_{}",
                strategy.as_str(),
                hit.method.as_str(),
                level
            ),
            None => format!("{}_fallback_{}", strategy.as_str(), hit.method.as_str()),
        };
        MatchResult::fallback(
            Arc::clone(self.index.college(hit.college_idx)),
            hit.confidence,
            method,
            strategy,
            step,
            hit.method,
        )
    }
}

/// Highest confidence wins. Exact ties go to the earlier technique in
/// priority order (fuzzy search, abbreviation, typo correction). Returns the
/// winner's 1-based step.
pub fn pick_parallel_winner(hits: [Option<TechniqueHit>; 3]) -> Option<(u8, TechniqueHit)> {
    let mut winner: Option<(u8, TechniqueHit)> = None;
    for (pos, hit) in hits.into_iter().enumerate() {
        let Some(hit) = hit else { continue };
        if winner.map_or(true, |(_, best)| hit.confidence > best.confidence) {
            winner = Some((pos as u8 + 1, hit));
        }
    }
    winner
}

/// Number of numbered steps a strategy can report on success.
pub fn technique_count(strategy: FallbackStrategy) -> u8 {
    match strategy {
        FallbackStrategy::Series | FallbackStrategy::Parallel => {
            FallbackMethod::PRIORITY.len() as u8
        }
        FallbackStrategy::Sequential => SEQUENTIAL_FUZZY_LEVELS.len() as u8 + 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::hierarchical::HierarchicalMatcher;
    use crate::models::college::CanonicalCollege;
    use crate::models::matching::{AlgorithmUsed, MatchType};
    use crate::utils::corrections::CorrectionTables;

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

    struct Fixture {
        hierarchical: HierarchicalMatcher,
        fallback: FallbackOrchestrator,
    }

    impl Fixture {
        fn new() -> Self {
            let tables = CorrectionTables::from_pairs(
                Some("test"),
                &[("SMS", "SAWAI MAN SINGH"), ("RNT", "RABINDRANATH TAGORE")],
                &[("VARDHAMAN", "VARDHMAN")],
                &[],
            );
            let normalizer = Arc::new(TextNormalizer::new(Arc::new(tables)).unwrap());
            let index = Arc::new(IndexSet::build(vec![
                college("R1", "SAWAI MAN SINGH MEDICAL COLLEGE", "RAJASTHAN"),
                college("R2", "RABINDRANATH TAGORE MEDICAL COLLEGE", "RAJASTHAN"),
                college("K1", "GOVERNMENT MEDICAL COLLEGE THIRUVANANTHAPURAM", "KERALA"),
            ]));
            Self {
                hierarchical: HierarchicalMatcher::new(Arc::clone(&index), Arc::clone(&normalizer)),
                fallback: FallbackOrchestrator::new(index, normalizer),
            }
        }

        fn ctx(&self, name: &str, state: &str) -> MatchContext {
            self.hierarchical.prepare(name, state).unwrap()
        }
    }

    #[test]
    fn test_series_abbreviation() {
        let f = Fixture::new();
        let ctx = f.ctx("SMS MEDICAL COLLEGE", "RAJASTHAN");
        assert!(f.hierarchical.match_prepared(&ctx).is_err());

        let result = f.fallback.run(FallbackStrategy::Series, &ctx).unwrap();
        assert_eq!(result.match_type, MatchType::EnhancedFallback);
        assert_eq!(result.algorithm_used, AlgorithmUsed::SeriesFallback);
        assert_eq!(result.fallback_method, Some(FallbackMethod::Abbreviation));
        assert_eq!(result.method, "series_fallback_abbreviation");
        assert_eq!(result.confidence, 0.9);
        assert_eq!(result.step, 2);
        assert_eq!(result.college_id(), Some("R1"));
    }

    #[test]
    fn test_sequential_steps() {
        let f = Fixture::new();
        let ctx = f.ctx("SMS MEDICAL COLLEGE", "RAJASTHAN");
        let result = f.fallback.run(FallbackStrategy::Sequential, &ctx).unwrap();
        assert_eq!(result.step, 4);
        assert_eq!(result.method, "sequential_fallback_abbreviation");

        // word order defeats the edit-distance stages but not the token search
        let ctx = f.ctx("THIRUVANANTHAPURAM GOVERNMENT MEDICAL COLLEGE", "KERALA");
        assert!(f.hierarchical.match_prepared(&ctx).is_err());
        let result = f.fallback.run(FallbackStrategy::Sequential, &ctx).unwrap();
        assert_eq!(result.step, 1);
        assert_eq!(result.method, "sequential_fallback_fuzzy_search_high");
        assert_eq!(result.fallback_method, Some(FallbackMethod::FuzzySearch));
        assert_eq!(result.confidence, MAX_FUZZY_CONFIDENCE);
    }

    #[test]
    fn test_parallel_picks_highest_confidence() {
        let f = Fixture::new();
        let ctx = f.ctx("THIRUVANANTHAPURAM GOVERNMENT MEDICAL COLLEGE", "KERALA");
        let result = f.fallback.run(FallbackStrategy::Parallel, &ctx).unwrap();
        assert_eq!(result.algorithm_used, AlgorithmUsed::ParallelFallback);
        assert_eq!(result.fallback_method, Some(FallbackMethod::FuzzySearch));
        assert_eq!(result.step, 1);

        let ctx = f.ctx("SMS MEDICAL COLLEGE", "RAJASTHAN");
        let result = f.fallback.run(FallbackStrategy::Parallel, &ctx).unwrap();
        for method in FallbackMethod::PRIORITY {
            if let Some(hit) = f.fallback.technique(method, &ctx) {
                assert!(result.confidence >= hit.confidence);
            }
        }
        assert_eq!(result.fallback_method, Some(FallbackMethod::Abbreviation));
    }

    fn hit(college_idx: usize, confidence: f64, method: FallbackMethod) -> Option<TechniqueHit> {
        Some(TechniqueHit {
            college_idx,
            confidence,
            method,
        })
    }

    #[test]
    fn test_parallel_ties_follow_priority() {
        let (step, winner) = pick_parallel_winner([
            hit(0, 0.9, FallbackMethod::FuzzySearch),
            hit(1, 0.9, FallbackMethod::Abbreviation),
            None,
        ])
        .unwrap();
        assert_eq!(step, 1);
        assert_eq!(winner.method, FallbackMethod::FuzzySearch);
        assert_eq!(winner.college_idx, 0);

        let (step, winner) = pick_parallel_winner([
            None,
            hit(1, 0.95, FallbackMethod::Abbreviation),
            hit(2, 0.95, FallbackMethod::TypoCorrection),
        ])
        .unwrap();
        assert_eq!(step, 2);
        assert_eq!(winner.method, FallbackMethod::Abbreviation);

        let (step, winner) = pick_parallel_winner([
            hit(0, 0.75, FallbackMethod::FuzzySearch),
            hit(1, 0.9, FallbackMethod::Abbreviation),
            hit(2, 0.95, FallbackMethod::TypoCorrection),
        ])
        .unwrap();
        assert_eq!(step, 3);
        assert_eq!(winner.college_idx, 2);

        assert!(pick_parallel_winner([None, None, None]).is_none());
    }

    #[test]
    fn test_address_only_query_is_refused() {
        let tables = CorrectionTables::from_pairs(Some("test"), &[], &[], &[]);
        let normalizer = Arc::new(TextNormalizer::new(Arc::new(tables)).unwrap());
        let mut dental = college("D1", "GOVERNMENT DENTAL COLLEGE", "RAJASTHAN");
        dental.address = Some("JAIPUR".to_string());
        let index = Arc::new(IndexSet::build(vec![dental]));
        let hierarchical = HierarchicalMatcher::new(Arc::clone(&index), Arc::clone(&normalizer));
        let fallback = FallbackOrchestrator::new(index, normalizer);

        let ctx = hierarchical.prepare("JAIPUR", "RAJASTHAN").unwrap();
        let hit = fallback.fuzzy_search(&ctx).unwrap();
        assert!(hit.confidence < FUZZY_SEARCH_THRESHOLD);
        for strategy in FallbackStrategy::ALL {
            assert!(fallback.run(strategy, &ctx).is_err());
        }
    }

    #[test]
    fn test_every_strategy_reports_its_failure() {
        let f = Fixture::new();
        let ctx = f.ctx("CHRISTIAN MEDICAL COLLEGE", "KERALA");
        for strategy in FallbackStrategy::ALL {
            let failure = f.fallback.run(strategy, &ctx).unwrap_err();
            assert_eq!(failure.diagnostic, format!("{}_fallback_failed", strategy));
            assert_eq!(failure.step, technique_count(strategy) + 1);
            assert_eq!(failure.algorithm, strategy.algorithm());
        }
    }

    #[test]
    fn test_expansion_without_change_is_not_a_hit() {
        let f = Fixture::new();
        let ctx = f.ctx("SAWAI MAN SINGH MEDICAL COLLEGE", "RAJASTHAN");
        assert!(f.fallback.abbreviation_lookup(&ctx).is_none());
        assert!(f.fallback.typo_lookup(&ctx).is_some());
    }
}
