// src/matching/registry.rs - Canonical college registry loading and validation
use anyhow::{bail, Context, Result};
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::models::college::CanonicalCollege;

/// `X College (Old Name)` -> (`X College`, `Old Name`)
static RE_TRAILING_PARENTHETICAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.*?)\s*\(([^()]*)\)\s*$").expect("invalid RE_TRAILING_PARENTHETICAL")
});

/// A registry row as stored on disk, before the previous-name split.
#[derive(Debug, Deserialize)]
struct RawCollegeRecord {
    id: String,
    name: String,
    #[serde(default)]
    previous_name: Option<String>,
    #[serde(default)]
    address: Option<String>,
    state: String,
    #[serde(rename = "type", default)]
    college_type: String,
    #[serde(default)]
    management: Option<String>,
    #[serde(default)]
    university: Option<String>,
}

pub fn load_registry(path: &Path) -> Result<Vec<CanonicalCollege>> {
    info!("Loading college registry from {}", path.display());
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read college registry {}", path.display()))?;
    let colleges = parse_registry(&raw)
        .with_context(|| format!("Invalid college registry {}", path.display()))?;
    info!("Loaded {} canonical colleges", colleges.len());
    Ok(colleges)
}

/// Parses and validates a JSON array of registry records.
pub fn parse_registry(json: &str) -> Result<Vec<CanonicalCollege>> {
    let records: Vec<RawCollegeRecord> =
        serde_json::from_str(json).context("Registry is not a JSON array of college records")?;
    if records.is_empty() {
        bail!("Registry contains no colleges");
    }

    let mut seen_ids: HashSet<String> = HashSet::with_capacity(records.len());
    let mut colleges = Vec::with_capacity(records.len());

    for (idx, record) in records.into_iter().enumerate() {
        let id = record.id.trim().to_string();
        if id.is_empty() {
            bail!("Record {} has a blank id", idx);
        }
        if !seen_ids.insert(id.clone()) {
            bail!("Record {} reuses id '{}'", idx, id);
        }
        if record.name.trim().is_empty() {
            bail!("Record {} ('{}') has a blank name", idx, id);
        }
        if record.state.trim().is_empty() {
            bail!("Record {} ('{}') has a blank state", idx, id);
        }

        let (name, split_previous) = split_previous_name(&record.name);
        let previous_name = non_blank(record.previous_name).or(split_previous);
        if let Some(previous) = &previous_name {
            debug!("{}: '{}' previously '{}'", id, name, previous);
        }

        colleges.push(CanonicalCollege {
            id,
            name,
            previous_name,
            address: non_blank(record.address),
            state: record.state.trim().to_string(),
            college_type: record.college_type.trim().to_string(),
            management: non_blank(record.management),
            university: non_blank(record.university),
        });
    }
    Ok(colleges)
}

/// Splits a trailing parenthetical off a stored name. Empty parentheses are
/// dropped from the name without producing a previous name.
pub fn split_previous_name(stored: &str) -> (String, Option<String>) {
    let trimmed = stored.trim();
    match RE_TRAILING_PARENTHETICAL.captures(trimmed) {
        Some(caps) => {
            let name = caps[1].trim();
            let previous = caps[2].trim();
            if name.is_empty() {
                // the whole name is a parenthetical; keep it as is
                return (trimmed.to_string(), None);
            }
            let previous = (!previous.is_empty()).then(|| previous.to_string());
            (name.to_string(), previous)
        }
        None => (trimmed.to_string(), None),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
