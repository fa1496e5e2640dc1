// src/matching/index.rs - Immutable lookup structures built once from the registry
use log::{info, warn};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::matching::fuzzy_index::FuzzyIndex;
use crate::matching::normalize::{normalize, TextNormalizer};
use crate::models::college::CanonicalCollege;

/// Colleges registered under a state, as resolved from a raw state string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateCandidates {
    /// Registry positions, ascending.
    pub indices: Vec<usize>,
    /// Normalized state keys that contributed candidates.
    pub state_keys: Vec<String>,
    /// True when the direct key missed and the alias pass found the states.
    pub via_alias: bool,
}

impl StateCandidates {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }
}

fn exact_key(name: &str, state: &str) -> String {
    format!("{}|{}", name, state)
}

/// State index, exact index and fuzzy search structure over one registry
/// snapshot. Nothing here is mutable after `build`; share it behind an `Arc`.
#[derive(Debug)]
pub struct IndexSet {
    colleges: Vec<Arc<CanonicalCollege>>,
    normalized_names: Vec<String>,
    normalized_previous_names: Vec<Option<String>>,
    by_state: BTreeMap<String, Vec<usize>>,
    // `name|state` keys exactly as stored
    exact_by_name: HashMap<String, usize>,
    exact_by_previous_name: HashMap<String, usize>,
    // the same keys after normalization, for corrected or expanded text
    normalized_by_name: HashMap<String, usize>,
    normalized_by_previous_name: HashMap<String, usize>,
    fuzzy: FuzzyIndex,
}

impl IndexSet {
    pub fn build(registry: Vec<CanonicalCollege>) -> Self {
        let colleges: Vec<Arc<CanonicalCollege>> = registry.into_iter().map(Arc::new).collect();

        let mut by_state: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        let mut exact_by_name = HashMap::with_capacity(colleges.len());
        let mut exact_by_previous_name = HashMap::new();
        let mut normalized_by_name = HashMap::with_capacity(colleges.len());
        let mut normalized_by_previous_name = HashMap::new();
        let mut normalized_names = Vec::with_capacity(colleges.len());
        let mut normalized_previous_names = Vec::with_capacity(colleges.len());
        let mut duplicate_keys = 0usize;

        for (idx, college) in colleges.iter().enumerate() {
            let state_key = normalize(&college.state);
            by_state.entry(state_key.clone()).or_default().push(idx);

            let norm_name = normalize(&college.name);
            duplicate_keys += insert_first(
                &mut exact_by_name,
                exact_key(&college.name, &college.state),
                idx,
            );
            duplicate_keys += insert_first(
                &mut normalized_by_name,
                exact_key(&norm_name, &state_key),
                idx,
            );

            let norm_previous = college.previous_name.as_deref().map(|previous| {
                let norm_previous = normalize(previous);
                duplicate_keys += insert_first(
                    &mut exact_by_previous_name,
                    exact_key(previous, &college.state),
                    idx,
                );
                duplicate_keys += insert_first(
                    &mut normalized_by_previous_name,
                    exact_key(&norm_previous, &state_key),
                    idx,
                );
                norm_previous
            });

            normalized_names.push(norm_name);
            normalized_previous_names.push(norm_previous);
        }

        if duplicate_keys > 0 {
            warn!(
                "{} duplicate name|state keys in registry; the first registered college wins",
                duplicate_keys
            );
        }

        let fuzzy = FuzzyIndex::build(&colleges);
        info!(
            "Built index set: {} colleges across {} states, {} exact keys, {} search tokens",
            colleges.len(),
            by_state.len(),
            exact_by_name.len() + exact_by_previous_name.len(),
            fuzzy.token_count()
        );

        Self {
            colleges,
            normalized_names,
            normalized_previous_names,
            by_state,
            exact_by_name,
            exact_by_previous_name,
            normalized_by_name,
            normalized_by_previous_name,
            fuzzy,
        }
    }

    pub fn len(&self) -> usize {
        self.colleges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colleges.is_empty()
    }

    pub fn state_count(&self) -> usize {
        self.by_state.len()
    }

    pub fn college(&self, idx: usize) -> &Arc<CanonicalCollege> {
        &self.colleges[idx]
    }

    pub fn normalized_name(&self, idx: usize) -> &str {
        &self.normalized_names[idx]
    }

    pub fn normalized_previous_name(&self, idx: usize) -> Option<&str> {
        self.normalized_previous_names[idx].as_deref()
    }

    pub fn fuzzy(&self) -> &FuzzyIndex {
        &self.fuzzy
    }

    /// Direct lookup by normalized state; on a miss, every registered state
    /// key whose alias-resolved form equals the query's alias-resolved form.
    pub fn state_candidates(
        &self,
        raw_state: &str,
        normalizer: &TextNormalizer,
    ) -> StateCandidates {
        let key = normalize(raw_state);
        if key.is_empty() {
            return StateCandidates::default();
        }
        if let Some(indices) = self.by_state.get(&key) {
            return StateCandidates {
                indices: indices.clone(),
                state_keys: vec![key],
                via_alias: false,
            };
        }

        let canonical = normalizer.canonical_state(&key);
        let mut candidates = StateCandidates {
            via_alias: true,
            ..Default::default()
        };
        for (state_key, indices) in &self.by_state {
            if normalizer.canonical_state(state_key) == canonical {
                candidates.indices.extend(indices.iter().copied());
                candidates.state_keys.push(state_key.clone());
            }
        }
        candidates.indices.sort_unstable();
        candidates
    }

    /// `name|state` against stored names, current name first.
    pub fn exact_lookup(&self, name: &str, state: &str) -> Option<usize> {
        let key = exact_key(name, state);
        self.exact_by_name
            .get(&key)
            .or_else(|| self.exact_by_previous_name.get(&key))
            .copied()
    }

    /// Like `exact_lookup`, for a normalized name and normalized state key.
    pub fn normalized_lookup(&self, normalized_name: &str, state_key: &str) -> Option<usize> {
        if normalized_name.is_empty() {
            return None;
        }
        let key = exact_key(normalized_name, state_key);
        self.normalized_by_name
            .get(&key)
            .or_else(|| self.normalized_by_previous_name.get(&key))
            .copied()
    }
}

/// Returns 1 when the key was already taken.
fn insert_first(map: &mut HashMap<String, usize>, key: String, idx: usize) -> usize {
    match map.entry(key) {
        std::collections::hash_map::Entry::Occupied(_) => 1,
        std::collections::hash_map::Entry::Vacant(slot) => {
            slot.insert(idx);
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::corrections::CorrectionTables;

    fn college(id: &str, name: &str, previous: Option<&str>, state: &str) -> CanonicalCollege {
        CanonicalCollege {
            id: id.to_string(),
            name: name.to_string(),
            previous_name: previous.map(str::to_string),
            address: None,
            state: state.to_string(),
            college_type: "MEDICAL".to_string(),
            management: None,
            university: None,
        }
    }

    fn index() -> IndexSet {
        IndexSet::build(vec![
            college(
                "D1",
                "MAULANA AZAD MEDICAL COLLEGE",
                Some("IRWIN HOSPITAL MEDICAL COLLEGE"),
                "DELHI (NCT)",
            ),
            college("R1", "SAWAI MAN SINGH MEDICAL COLLEGE", None, "RAJASTHAN"),
            college("D2", "LADY HARDINGE MEDICAL COLLEGE", None, "NEW DELHI"),
            college("R2", "SARDAR PATEL MEDICAL COLLEGE", None, "Rajasthan"),
        ])
    }

    fn normalizer() -> TextNormalizer {
        TextNormalizer::new(Arc::new(CorrectionTables::builtin())).unwrap()
    }

    #[test]
    fn test_state_index_groups_by_normalized_state() {
        let index = index();
        let candidates = index.state_candidates("rajasthan ", &normalizer());
        assert_eq!(candidates.indices, vec![1, 3]);
        assert!(!candidates.via_alias);
        assert_eq!(index.state_count(), 3);
    }

    #[test]
    fn test_alias_pass_unions_registered_states() {
        let index = index();
        let candidates = index.state_candidates("NCT of Delhi", &normalizer());
        assert!(candidates.via_alias);
        assert_eq!(candidates.indices, vec![0, 2]);
        assert_eq!(candidates.state_keys, vec!["DELHI NCT".to_string(), "NEW DELHI".to_string()]);
    }

    #[test]
    fn test_unknown_state_is_empty() {
        let index = index();
        assert!(index.state_candidates("NOWHERESTATE", &normalizer()).is_empty());
        assert!(index.state_candidates("", &normalizer()).is_empty());
    }

    #[test]
    fn test_exact_lookup_is_raw_cased() {
        let index = index();
        assert_eq!(index.exact_lookup("SAWAI MAN SINGH MEDICAL COLLEGE", "RAJASTHAN"), Some(1));
        assert_eq!(index.exact_lookup("Sawai Man Singh Medical College", "RAJASTHAN"), None);
        assert_eq!(
            index.exact_lookup("IRWIN HOSPITAL MEDICAL COLLEGE", "DELHI (NCT)"),
            Some(0)
        );
    }

    #[test]
    fn test_normalized_lookup() {
        let index = index();
        assert_eq!(index.normalized_lookup("SARDAR PATEL MEDICAL COLLEGE", "RAJASTHAN"), Some(3));
        assert_eq!(index.normalized_lookup("IRWIN HOSPITAL MEDICAL COLLEGE", "DELHI NCT"), Some(0));
        assert_eq!(index.normalized_lookup("", "RAJASTHAN"), None);
    }
}
