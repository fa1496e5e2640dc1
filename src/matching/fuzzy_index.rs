// src/matching/fuzzy_index.rs - Token-indexed approximate lookup over the registry
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use crate::matching::normalize::{normalize, sort_tokens, tokenize};
use crate::models::college::CanonicalCollege;
use crate::utils::constants::{ADDRESS_FIELD_WEIGHT, MAX_FUZZY_RESULTS, SORTED_TOKEN_WEIGHT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuzzyField {
    Name,
    PreviousName,
    Address,
}

impl FuzzyField {
    fn weight(self) -> f64 {
        match self {
            FuzzyField::Name | FuzzyField::PreviousName => 1.0,
            FuzzyField::Address => ADDRESS_FIELD_WEIGHT,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyHit {
    pub college_idx: usize,
    pub score: f64,
    /// The field that produced the best score for this college.
    pub field: FuzzyField,
}

#[derive(Debug)]
struct IndexedField {
    college_idx: usize,
    field: FuzzyField,
    normalized: String,
    sorted: String,
}

/// Inverted index from search tokens to the name, previous-name and address
/// fields that contain them. Candidates must share at least one token with the
/// query; each candidate is then scored by edit similarity, scaled down for
/// token-sorted comparisons and for the address field.
#[derive(Debug, Default)]
pub struct FuzzyIndex {
    fields: Vec<IndexedField>,
    token_to_fields: HashMap<String, Vec<usize>>,
}

impl FuzzyIndex {
    pub fn build(colleges: &[Arc<CanonicalCollege>]) -> Self {
        let mut index = FuzzyIndex::default();
        for (college_idx, college) in colleges.iter().enumerate() {
            let fields = [
                (FuzzyField::Name, Some(college.name.as_str())),
                (FuzzyField::PreviousName, college.previous_name.as_deref()),
                (FuzzyField::Address, college.address.as_deref()),
            ];
            for (field, text) in fields {
                if let Some(text) = text {
                    index.add_field(college_idx, field, text);
                }
            }
        }
        index
    }

    fn add_field(&mut self, college_idx: usize, field: FuzzyField, text: &str) {
        let normalized = normalize(text);
        if normalized.is_empty() {
            return;
        }
        let field_idx = self.fields.len();
        let tokens: BTreeSet<&str> = tokenize(&normalized).into_iter().collect();
        for token in tokens {
            self.token_to_fields
                .entry(token.to_string())
                .or_default()
                .push(field_idx);
        }
        self.fields.push(IndexedField {
            college_idx,
            field,
            sorted: sort_tokens(&normalized),
            normalized,
        });
    }

    pub fn token_count(&self) -> usize {
        self.token_to_fields.len()
    }

    /// Ranked hits for an already normalized query, best first, ties in
    /// registry order. With `scope` set, only those colleges are considered.
    pub fn search(&self, query: &str, scope: Option<&[usize]>) -> Vec<FuzzyHit> {
        if query.is_empty() {
            return Vec::new();
        }
        let scope: Option<HashSet<usize>> = scope.map(|s| s.iter().copied().collect());

        let mut candidate_fields: BTreeSet<usize> = BTreeSet::new();
        for token in tokenize(query) {
            if let Some(field_indices) = self.token_to_fields.get(token) {
                candidate_fields.extend(field_indices.iter().copied());
            }
        }

        let query_sorted = sort_tokens(query);
        let mut best_per_college: HashMap<usize, FuzzyHit> = HashMap::new();

        for field_idx in candidate_fields {
            let entry = &self.fields[field_idx];
            if let Some(ref allowed) = scope {
                if !allowed.contains(&entry.college_idx) {
                    continue;
                }
            }
            let raw = strsim::normalized_levenshtein(query, &entry.normalized);
            let sorted = SORTED_TOKEN_WEIGHT
                * strsim::normalized_levenshtein(&query_sorted, &entry.sorted);
            let score = entry.field.weight() * raw.max(sorted);

            match best_per_college.get_mut(&entry.college_idx) {
                Some(existing) if existing.score >= score => {}
                Some(existing) => {
                    existing.score = score;
                    existing.field = entry.field;
                }
                None => {
                    best_per_college.insert(
                        entry.college_idx,
                        FuzzyHit {
                            college_idx: entry.college_idx,
                            score,
                            field: entry.field,
                        },
                    );
                }
            }
        }

        let mut hits: Vec<FuzzyHit> = best_per_college.into_values().collect();
        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.college_idx.cmp(&b.college_idx))
        });
        hits.truncate(MAX_FUZZY_RESULTS);
        hits
    }

    pub fn best(&self, query: &str, scope: Option<&[usize]>) -> Option<FuzzyHit> {
        self.search(query, scope).into_iter().next()
    }
}
