// src/utils/constants.rs

/// Minimum similarity for the first-over-threshold location disambiguation stage.
pub const LOCATION_DISAMBIGUATION_THRESHOLD: f64 = 0.8;

/// Minimum similarity for the best-of fuzzy stage inside the hierarchical matcher.
pub const HIERARCHICAL_FUZZY_THRESHOLD: f64 = 0.7;

/// Minimum fuzzy-search confidence accepted by the series and parallel strategies.
pub const FUZZY_SEARCH_THRESHOLD: f64 = 0.7;

/// Graded fuzzy-search thresholds tried in order by the sequential strategy.
pub const SEQUENTIAL_HIGH_THRESHOLD: f64 = 0.9;
pub const SEQUENTIAL_MEDIUM_THRESHOLD: f64 = 0.8;
pub const SEQUENTIAL_LOW_THRESHOLD: f64 = 0.7;

/// Fixed confidence for an exact hit after abbreviation expansion.
pub const ABBREVIATION_CONFIDENCE: f64 = 0.9;

/// Fixed confidence for an exact hit after typo correction.
pub const TYPO_CORRECTION_CONFIDENCE: f64 = 0.95;

/// Confidence of an exact index hit.
pub const EXACT_MATCH_CONFIDENCE: f64 = 1.0;

/// Fallback matches below this confidence are routed to manual review.
pub const MANUAL_REVIEW_CONFIDENCE: f64 = 0.8;

/// Tokens shorter than this are not indexed by the fuzzy search structure.
pub const MIN_TOKEN_LENGTH: usize = 2;

/// Scale on address-field scores. Keeps an address-only hit under the fuzzy
/// acceptance threshold.
pub const ADDRESS_FIELD_WEIGHT: f64 = 0.5;

/// Applied to similarity computed on token-sorted forms.
pub const SORTED_TOKEN_WEIGHT: f64 = 0.95;

/// Ceiling on fuzzy-search confidence; 1.0 is reserved for exact hits.
pub const MAX_FUZZY_CONFIDENCE: f64 = 0.95;

/// Upper bound on ranked hits returned by a single fuzzy search.
pub const MAX_FUZZY_RESULTS: usize = 10;

pub const DEFAULT_REGISTRY_PATH: &str = "data/colleges.json";
