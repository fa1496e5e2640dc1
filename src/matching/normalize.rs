// src/matching/normalize.rs - Text normalization and table-driven corrections
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::utils::constants::MIN_TOKEN_LENGTH;
use crate::utils::corrections::CorrectionTables;

static RE_NON_ALNUM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Z0-9\s]+").expect("invalid RE_NON_ALNUM"));
static RE_WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("invalid RE_WHITESPACE"));

pub const STOPWORDS: [&str; 12] = [
    "OF", "AND", "THE", "FOR", "IN", "AT", "BY", "TO", "ON", "AN", "A", "WITH",
];

static STOPWORD_SET: Lazy<HashSet<&'static str>> = Lazy::new(|| STOPWORDS.into_iter().collect());

/// Uppercases, drops everything outside `[A-Z0-9]` and whitespace, then
/// collapses whitespace runs and trims. Total over all inputs.
pub fn normalize(text: &str) -> String {
    let upper = text.to_uppercase();
    let stripped = RE_NON_ALNUM.replace_all(&upper, "");
    RE_WHITESPACE.replace_all(stripped.trim(), " ").into_owned()
}

/// The part of a raw college field that names the college: everything before
/// the first comma, trimmed. The remainder is address noise.
pub fn extract_college_name(raw: &str) -> &str {
    raw.split_once(',').map_or(raw, |(head, _)| head).trim()
}

/// Searchable tokens of an already normalized string.
pub fn tokenize(normalized: &str) -> Vec<&str> {
    normalized
        .split(' ')
        .filter(|t| t.len() >= MIN_TOKEN_LENGTH && !STOPWORD_SET.contains(t))
        .collect()
}

/// Tokens in lexical order, so word order stops mattering.
pub fn sort_tokens(normalized: &str) -> String {
    let mut tokens: Vec<&str> = normalized.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Applies the injected correction tables. Each table compiles into a single
/// whole-word pattern so a key only ever replaces a standalone token.
#[derive(Debug)]
pub struct TextNormalizer {
    tables: Arc<CorrectionTables>,
    typo_pattern: Option<Regex>,
    abbreviation_pattern: Option<Regex>,
}

impl TextNormalizer {
    pub fn new(tables: Arc<CorrectionTables>) -> Result<Self> {
        let typo_pattern =
            build_word_pattern(&tables.typos).context("Failed to compile typo table")?;
        let abbreviation_pattern = build_word_pattern(&tables.abbreviations)
            .context("Failed to compile abbreviation table")?;
        Ok(Self {
            tables,
            typo_pattern,
            abbreviation_pattern,
        })
    }

    pub fn tables(&self) -> &CorrectionTables {
        &self.tables
    }

    pub fn correct_typos(&self, text: &str) -> String {
        replace_words(self.typo_pattern.as_ref(), &self.tables.typos, text)
    }

    pub fn expand_abbreviations(&self, text: &str) -> String {
        replace_words(
            self.abbreviation_pattern.as_ref(),
            &self.tables.abbreviations,
            text,
        )
    }

    /// Normalized state with any alias resolved, e.g. `Delhi (NCT)` -> `NEW DELHI`.
    pub fn canonical_state(&self, state: &str) -> String {
        let normalized = normalize(state);
        match self.tables.state_aliases.get(&normalized) {
            Some(canonical) => canonical.clone(),
            None => normalized,
        }
    }
}

fn build_word_pattern(table: &BTreeMap<String, String>) -> Result<Option<Regex>> {
    let mut keys: Vec<&str> = table.keys().map(String::as_str).filter(|k| !k.is_empty()).collect();
    if keys.is_empty() {
        return Ok(None);
    }
    // Longest first so multi-word keys win over their own prefixes.
    keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    let alternation = keys
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");
    let pattern = Regex::new(&format!(r"(?i)\b(?:{})\b", alternation))
        .with_context(|| format!("Invalid word pattern built from {} keys", keys.len()))?;
    Ok(Some(pattern))
}

fn replace_words(pattern: Option<&Regex>, table: &BTreeMap<String, String>, text: &str) -> String {
    let Some(re) = pattern else {
        return text.to_string();
    };
    re.replace_all(text, |caps: &Captures| {
        let matched = &caps[0];
        table
            .get(&normalize(matched))
            .cloned()
            .unwrap_or_else(|| matched.to_string())
    })
    .into_owned()
}
