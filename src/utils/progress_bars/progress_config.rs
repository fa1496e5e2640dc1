// src/utils/progress_bars/progress_config.rs

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::env;
use std::time::Duration;

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}";
const BAR_CHARS: &str = "█▉▊▋▌▍▎▏  ";

/// Configuration for progress display in the matcher binaries
#[derive(Debug, Clone)]
pub struct ProgressConfig {
    /// Whether to show progress bars at all
    pub enabled: bool,
    /// Whether to show per-strategy sub-bars
    pub detailed: bool,
    /// Refresh rate for progress bars in milliseconds
    pub refresh_rate_ms: u64,
    /// Whether to show memory usage in progress messages
    pub show_memory: bool,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            detailed: true,
            refresh_rate_ms: 100,
            show_memory: true,
        }
    }
}

impl ProgressConfig {
    pub fn from_env() -> Self {
        Self {
            enabled: env::var("PROGRESS_ENABLED")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
            detailed: env::var("PROGRESS_DETAILED")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
            refresh_rate_ms: env::var("PROGRESS_REFRESH_RATE_MS")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .unwrap_or(100),
            show_memory: env::var("PROGRESS_SHOW_MEMORY")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
        }
    }

    /// A container for per-strategy sub-bars, only when detailed progress is on.
    pub fn create_multi_progress(&self) -> Option<MultiProgress> {
        self.should_show_detailed().then(MultiProgress::new)
    }

    /// A styled bar of `len` steps, or `None` when progress is disabled.
    pub fn create_bar(&self, len: u64, message: &str) -> Option<ProgressBar> {
        if !self.enabled {
            return None;
        }
        let pb = ProgressBar::new(len);
        // the template is a constant; a bad one falls back to the default style
        if let Ok(style) = ProgressStyle::default_bar().template(BAR_TEMPLATE) {
            pb.set_style(style.progress_chars(BAR_CHARS));
        }
        pb.enable_steady_tick(Duration::from_millis(self.refresh_rate_ms.max(1)));
        pb.set_message(message.to_string());
        Some(pb)
    }

    pub fn should_show_detailed(&self) -> bool {
        self.enabled && self.detailed
    }

    pub fn should_show_memory(&self) -> bool {
        self.enabled && self.show_memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = ProgressConfig::default();
        assert!(config.enabled);
        assert!(config.detailed);
        assert_eq!(config.refresh_rate_ms, 100);
        assert!(config.show_memory);
    }

    #[test]
    #[serial]
    fn test_env_config() {
        env::set_var("PROGRESS_ENABLED", "false");
        env::set_var("PROGRESS_DETAILED", "false");
        env::set_var("PROGRESS_REFRESH_RATE_MS", "50");
        env::set_var("PROGRESS_SHOW_MEMORY", "false");

        let config = ProgressConfig::from_env();
        assert!(!config.enabled);
        assert!(!config.detailed);
        assert_eq!(config.refresh_rate_ms, 50);
        assert!(!config.show_memory);

        env::remove_var("PROGRESS_ENABLED");
        env::remove_var("PROGRESS_DETAILED");
        env::remove_var("PROGRESS_REFRESH_RATE_MS");
        env::remove_var("PROGRESS_SHOW_MEMORY");
    }

    #[test]
    fn test_disabled_config_draws_nothing() {
        let mut config = ProgressConfig::default();
        config.enabled = false;
        assert!(config.create_multi_progress().is_none());
        assert!(config.create_bar(10, "matching").is_none());
        assert!(!config.should_show_detailed());
        assert!(!config.should_show_memory());
    }

    #[test]
    fn test_detailed_off_skips_sub_bars() {
        let mut config = ProgressConfig::default();
        assert!(config.create_multi_progress().is_some());
        config.detailed = false;
        assert!(config.create_multi_progress().is_none());
        assert!(config.create_bar(10, "matching").is_some());
    }

    #[test]
    fn test_enabled_bar_has_length() {
        let config = ProgressConfig::default();
        let pb = config.create_bar(42, "matching").unwrap();
        assert_eq!(pb.length(), Some(42));
        pb.finish_and_clear();
    }
}
