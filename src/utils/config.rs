// src/utils/config.rs - Environment-driven matcher configuration

use log::{info, warn};
use std::env;
use std::path::PathBuf;

use crate::models::matching::FallbackStrategy;
use crate::utils::constants::DEFAULT_REGISTRY_PATH;

#[derive(Debug, Clone, PartialEq)]
pub struct MatcherConfig {
    pub registry_path: PathBuf,
    /// Built-in tables are used when unset.
    pub correction_tables_path: Option<PathBuf>,
    pub fallback_strategy: FallbackStrategy,
    /// Worker threads for batch matching.
    pub threads: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            registry_path: PathBuf::from(DEFAULT_REGISTRY_PATH),
            correction_tables_path: None,
            fallback_strategy: FallbackStrategy::Series,
            threads: num_cpus::get(),
        }
    }
}

impl MatcherConfig {
    pub fn from_env() -> Self {
        let registry_path = env::var("COLLEGE_REGISTRY_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_REGISTRY_PATH));

        let correction_tables_path = env::var("CORRECTION_TABLES_PATH")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        let fallback_strategy = match env::var("FALLBACK_STRATEGY") {
            Ok(raw) => raw.parse().unwrap_or_else(|e| {
                warn!("{}; using series", e);
                FallbackStrategy::Series
            }),
            Err(_) => FallbackStrategy::Series,
        };

        let threads = env::var("MATCHER_THREADS")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or_else(num_cpus::get);

        Self {
            registry_path,
            correction_tables_path,
            fallback_strategy,
            threads,
        }
    }

    pub fn log_config(&self) {
        info!("⚙️  Matcher configuration:");
        info!("   • Registry: {}", self.registry_path.display());
        match &self.correction_tables_path {
            Some(path) => info!("   • Correction tables: {}", path.display()),
            None => info!("   • Correction tables: built-in"),
        }
        info!("   • Fallback strategy: {}", self.fallback_strategy);
        info!("   • Worker threads: {}", self.threads);
    }
}
