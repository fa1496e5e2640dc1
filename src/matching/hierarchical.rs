// src/matching/hierarchical.rs - Ordered, early-exit primary matching pipeline
use log::debug;
use std::sync::Arc;

use crate::matching::index::{IndexSet, StateCandidates};
use crate::matching::normalize::{extract_college_name, normalize, TextNormalizer};
use crate::matching::similarity::similarity_normalized;
use crate::models::matching::{diagnostics, AlgorithmUsed, MatchFailure, MatchResult};
use crate::utils::constants::{
    EXACT_MATCH_CONFIDENCE, HIERARCHICAL_FUZZY_THRESHOLD, LOCATION_DISAMBIGUATION_THRESHOLD,
};

/// Output of stages 1-2, shared by stages 3-5 and by whichever fallback
/// strategy runs afterwards.
#[derive(Debug, Clone)]
pub struct MatchContext {
    /// Raw name up to the first comma, trimmed.
    pub clean_name: String,
    /// `clean_name` after typo correction.
    pub corrected_name: String,
    pub normalized_name: String,
    pub raw_state: String,
    pub candidates: StateCandidates,
}

pub struct HierarchicalMatcher {
    index: Arc<IndexSet>,
    normalizer: Arc<TextNormalizer>,
}

impl HierarchicalMatcher {
    pub fn new(index: Arc<IndexSet>, normalizer: Arc<TextNormalizer>) -> Self {
        Self { index, normalizer }
    }

    /// Stage 1 (data correction) and stage 2 (state filter).
    pub fn prepare(&self, raw_name: &str, raw_state: &str) -> Result<MatchContext, MatchFailure> {
        let clean_name = extract_college_name(raw_name);
        if normalize(clean_name).is_empty() {
            return Err(MatchFailure::new(
                diagnostics::EMPTY_COLLEGE_NAME,
                1,
                AlgorithmUsed::Hierarchical,
            ));
        }
        let corrected_name = self.normalizer.correct_typos(clean_name);

        let candidates = self.index.state_candidates(raw_state, &self.normalizer);
        if candidates.is_empty() {
            return Err(MatchFailure::new(
                diagnostics::NO_STATE_CANDIDATES,
                2,
                AlgorithmUsed::Hierarchical,
            ));
        }
        if candidates.via_alias {
            debug!("State '{}' resolved through aliases to {:?}", raw_state, candidates.state_keys);
        }

        Ok(MatchContext {
            clean_name: clean_name.to_string(),
            normalized_name: normalize(&corrected_name),
            corrected_name,
            raw_state: raw_state.trim().to_string(),
            candidates,
        })
    }

    /// Stages 3-5 over a prepared context.
    pub fn match_prepared(&self, ctx: &MatchContext) -> Result<MatchResult, MatchFailure> {
        self.exact_name_match(ctx)
            .or_else(|| self.location_disambiguation(ctx))
            .or_else(|| self.fuzzy_fallback(ctx))
            .ok_or_else(|| {
                MatchFailure::new(
                    diagnostics::HIERARCHICAL_ALGORITHM_FAILED,
                    6,
                    AlgorithmUsed::Hierarchical,
                )
            })
    }

    pub fn match_college(
        &self,
        raw_name: &str,
        raw_state: &str,
    ) -> Result<MatchResult, MatchFailure> {
        let ctx = self.prepare(raw_name, raw_state)?;
        self.match_prepared(&ctx)
    }

    /// Stage 3. The raw state is tried first, then each stored state spelling
    /// among the candidates (which differs from the raw state after an alias pass).
    fn exact_name_match(&self, ctx: &MatchContext) -> Option<MatchResult> {
        let mut states: Vec<&str> = vec![ctx.raw_state.as_str()];
        for &idx in &ctx.candidates.indices {
            let stored = self.index.college(idx).state.as_str();
            if !states.contains(&stored) {
                states.push(stored);
            }
        }

        states.into_iter().find_map(|state| {
            self.index.exact_lookup(&ctx.corrected_name, state).map(|idx| {
                MatchResult::hierarchical(
                    Arc::clone(self.index.college(idx)),
                    EXACT_MATCH_CONFIDENCE,
                    diagnostics::EXACT_NAME_MATCH,
                    3,
                )
            })
        })
    }

    /// Stage 4: the first candidate, in registry order, whose name (or else
    /// previous name) clears the threshold. Not the best one.
    fn location_disambiguation(&self, ctx: &MatchContext) -> Option<MatchResult> {
        ctx.candidates.indices.iter().find_map(|&idx| {
            let name_score =
                similarity_normalized(&ctx.normalized_name, self.index.normalized_name(idx));
            let score = if name_score >= LOCATION_DISAMBIGUATION_THRESHOLD {
                name_score
            } else {
                self.index
                    .normalized_previous_name(idx)
                    .map(|previous| similarity_normalized(&ctx.normalized_name, previous))
                    .filter(|s| *s >= LOCATION_DISAMBIGUATION_THRESHOLD)?
            };
            Some(MatchResult::hierarchical(
                Arc::clone(self.index.college(idx)),
                score,
                diagnostics::LOCATION_DISAMBIGUATION,
                4,
            ))
        })
    }

    /// Stage 5: the best candidate over the lower threshold; the earliest wins ties.
    fn fuzzy_fallback(&self, ctx: &MatchContext) -> Option<MatchResult> {
        let mut best: Option<(usize, f64)> = None;
        for &idx in &ctx.candidates.indices {
            let score = self.candidate_score(&ctx.normalized_name, idx);
            if score < HIERARCHICAL_FUZZY_THRESHOLD {
                continue;
            }
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((idx, score));
            }
        }
        best.map(|(idx, score)| {
            MatchResult::hierarchical(
                Arc::clone(self.index.college(idx)),
                score,
                diagnostics::HIERARCHICAL_FUZZY_FALLBACK,
                5,
            )
        })
    }

    fn candidate_score(&self, normalized_query: &str, idx: usize) -> f64 {
        let name_score = similarity_normalized(normalized_query, self.index.normalized_name(idx));
        let previous_score = self
            .index
            .normalized_previous_name(idx)
            .map_or(0.0, |previous| similarity_normalized(normalized_query, previous));
        name_score.max(previous_score)
    }
}
