// src/utils/corrections.rs - Versioned correction tables injected into the matcher
//
// Abbreviation expansions, typo fixes and state-name aliases are all keyed by
// normalized text so lookups line up with the normalizer's output.

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::matching::normalize::normalize;

const BUILTIN_ABBREVIATIONS: &[(&str, &str)] = &[
    ("AIIMS", "ALL INDIA INSTITUTE OF MEDICAL SCIENCES"),
    ("COLL", "COLLEGE"),
    ("DEPT", "DEPARTMENT"),
    ("DIST", "DISTRICT"),
    ("GEN", "GENERAL"),
    ("GOVT", "GOVERNMENT"),
    ("HOSP", "HOSPITAL"),
    ("INST", "INSTITUTE"),
    ("JIPMER", "JAWAHARLAL INSTITUTE OF POSTGRADUATE MEDICAL EDUCATION AND RESEARCH"),
    ("KGMU", "KING GEORGES MEDICAL UNIVERSITY"),
    ("MED", "MEDICAL"),
    ("MGMT", "MANAGEMENT"),
    ("PGIMER", "POSTGRADUATE INSTITUTE OF MEDICAL EDUCATION AND RESEARCH"),
    ("PVT", "PRIVATE"),
    ("SCH", "SCHOOL"),
    ("SMS", "SAWAI MAN SINGH"),
    ("TECH", "TECHNOLOGY"),
    ("UNIV", "UNIVERSITY"),
];

const BUILTIN_TYPOS: &[(&str, &str)] = &[
    ("COLLAGE", "COLLEGE"),
    ("GOVERMENT", "GOVERNMENT"),
    ("GOVERNEMENT", "GOVERNMENT"),
    ("HOSPTIAL", "HOSPITAL"),
    ("INSTITUE", "INSTITUTE"),
    ("RESEACH", "RESEARCH"),
    ("UNIVERSTY", "UNIVERSITY"),
    ("VARDHAMAN", "VARDHMAN"),
];

const BUILTIN_STATE_ALIASES: &[(&str, &str)] = &[
    ("ANDAMAN & NICOBAR ISLANDS", "ANDAMAN AND NICOBAR ISLANDS"),
    ("CHATTISGARH", "CHHATTISGARH"),
    ("DELHI", "NEW DELHI"),
    ("DELHI (NCT)", "NEW DELHI"),
    ("JAMMU & KASHMIR", "JAMMU AND KASHMIR"),
    ("NCT OF DELHI", "NEW DELHI"),
    ("ORISSA", "ODISHA"),
    ("PONDICHERRY", "PUDUCHERRY"),
    ("TAMILNADU", "TAMIL NADU"),
    ("UTTARANCHAL", "UTTARAKHAND"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorrectionTables {
    /// Explicit version from the source file, or a content fingerprint.
    pub version: String,
    pub abbreviations: BTreeMap<String, String>,
    pub typos: BTreeMap<String, String>,
    pub state_aliases: BTreeMap<String, String>,
}

/// On-disk layout. Every table is optional.
#[derive(Debug, Deserialize)]
struct CorrectionTablesFile {
    version: Option<String>,
    #[serde(default)]
    abbreviations: BTreeMap<String, String>,
    #[serde(default)]
    typos: BTreeMap<String, String>,
    #[serde(default)]
    state_aliases: BTreeMap<String, String>,
}

impl CorrectionTables {
    pub fn from_maps(
        version: Option<String>,
        abbreviations: BTreeMap<String, String>,
        typos: BTreeMap<String, String>,
        state_aliases: BTreeMap<String, String>,
    ) -> Self {
        let abbreviations = normalize_table("abbreviations", abbreviations);
        let typos = normalize_table("typos", typos);
        let state_aliases = normalize_table("state_aliases", state_aliases);
        let version = version
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| fingerprint(&abbreviations, &typos, &state_aliases));
        Self {
            version,
            abbreviations,
            typos,
            state_aliases,
        }
    }

    pub fn from_pairs(
        version: Option<&str>,
        abbreviations: &[(&str, &str)],
        typos: &[(&str, &str)],
        state_aliases: &[(&str, &str)],
    ) -> Self {
        Self::from_maps(
            version.map(str::to_string),
            to_map(abbreviations),
            to_map(typos),
            to_map(state_aliases),
        )
    }

    pub fn empty() -> Self {
        Self::from_pairs(None, &[], &[], &[])
    }

    pub fn builtin() -> Self {
        Self::from_pairs(
            None,
            BUILTIN_ABBREVIATIONS,
            BUILTIN_TYPOS,
            BUILTIN_STATE_ALIASES,
        )
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: CorrectionTablesFile =
            serde_json::from_str(json).context("Correction tables are not valid JSON")?;
        Ok(Self::from_maps(
            file.version,
            file.abbreviations,
            file.typos,
            file.state_aliases,
        ))
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read correction tables from {}", path.display()))?;
        Self::from_json_str(&raw)
            .with_context(|| format!("Failed to parse correction tables in {}", path.display()))
    }

    /// Loads from `path` when given, otherwise the built-in tables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let tables = match path {
            Some(p) => Self::from_json_file(p)?,
            None => Self::builtin(),
        };
        tables.log_summary();
        Ok(tables)
    }

    pub fn log_summary(&self) {
        info!(
            "📚 Correction tables {}: {} abbreviations, {} typo fixes, {} state aliases",
            self.version,
            self.abbreviations.len(),
            self.typos.len(),
            self.state_aliases.len()
        );
    }
}

fn to_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn normalize_table(table_name: &str, raw: BTreeMap<String, String>) -> BTreeMap<String, String> {
    let mut table = BTreeMap::new();
    for (key, value) in raw {
        let (norm_key, norm_value) = (normalize(&key), normalize(&value));
        if norm_key.is_empty() {
            warn!("Skipping {} entry with empty key (raw: '{}')", table_name, key);
            continue;
        }
        if let Some(previous) = table.insert(norm_key.clone(), norm_value) {
            warn!(
                "Duplicate {} key '{}' after normalization; '{}' was replaced",
                table_name, norm_key, previous
            );
        }
    }
    table
}

fn fingerprint(
    abbreviations: &BTreeMap<String, String>,
    typos: &BTreeMap<String, String>,
    state_aliases: &BTreeMap<String, String>,
) -> String {
    let mut hasher = Sha256::new();
    for (tag, table) in [("A", abbreviations), ("T", typos), ("S", state_aliases)] {
        for (key, value) in table {
            hasher.update(format!("{}\t{}\t{}\n", tag, key, value).as_bytes());
        }
    }
    let digest = hex::encode(hasher.finalize());
    format!("sha256:{}", &digest[..12])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_tables_are_normalized() {
        let tables = CorrectionTables::builtin();
        assert_eq!(tables.abbreviations.get("SMS").map(String::as_str), Some("SAWAI MAN SINGH"));
        assert_eq!(tables.typos.get("VARDHAMAN").map(String::as_str), Some("VARDHMAN"));
        assert_eq!(tables.state_aliases.get("DELHI NCT").map(String::as_str), Some("NEW DELHI"));
        assert_eq!(
            tables.state_aliases.get("JAMMU KASHMIR").map(String::as_str),
            Some("JAMMU AND KASHMIR")
        );
        assert!(tables.version.starts_with("sha256:"));
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = CorrectionTables::from_pairs(None, &[("SMS", "SAWAI MAN SINGH")], &[], &[]);
        let b = CorrectionTables::from_pairs(None, &[("SMS", "SAWAI MAN SINGH")], &[], &[]);
        let c = CorrectionTables::from_pairs(None, &[("SMS", "SAWAI MANSINGH")], &[], &[]);
        assert_eq!(a.version, b.version);
        assert_ne!(a.version, c.version);
    }

    #[test]
    fn test_explicit_version_wins() {
        let tables = CorrectionTables::from_pairs(Some(" 2024-07 "), &[], &[], &[]);
        assert_eq!(tables.version, "2024-07");
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"abbreviations": {{"rims": "Regional Institute of Medical Sciences"}},
                "state_aliases": {{"Orissa": "Odisha"}}}}"#
        )
        .unwrap();

        let tables = CorrectionTables::from_json_file(file.path()).unwrap();
        assert_eq!(
            tables.abbreviations.get("RIMS").map(String::as_str),
            Some("REGIONAL INSTITUTE OF MEDICAL SCIENCES")
        );
        assert!(tables.typos.is_empty());
        assert_eq!(tables.state_aliases.get("ORISSA").map(String::as_str), Some("ODISHA"));
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        let err = CorrectionTables::from_json_str("{\"typos\": [1, 2]}").unwrap_err();
        assert!(format!("{:#}", err).contains("not valid JSON"));
    }

    #[test]
    fn test_empty_keys_are_dropped() {
        let abbreviations = [("...", "X"), ("MED", "MEDICAL")];
        let tables = CorrectionTables::from_pairs(None, &abbreviations, &[], &[]);
        assert_eq!(tables.abbreviations.len(), 1);
    }
}
