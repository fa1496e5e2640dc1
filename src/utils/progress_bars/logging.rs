// src/utils/progress_bars/logging.rs - Tagged logging helpers for matching runs
use log::{debug, info, warn};
use std::time::{Duration, Instant};

use crate::models::matching::FallbackStrategy;
use crate::models::stats_models::{FallbackTestResult, MatchRunStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Registry,
    Batch,
    Benchmark,
}

#[derive(Clone)]
pub struct MatchingLogger {
    tag: &'static str,
    emoji: &'static str,
    start_time: Instant,
}

impl MatchingLogger {
    pub fn for_phase(phase: RunPhase) -> Self {
        let (tag, emoji) = match phase {
            RunPhase::Registry => ("REGISTRY", "📚"),
            RunPhase::Batch => ("BATCH", "🏫"),
            RunPhase::Benchmark => ("BENCHMARK", "🏁"),
        };
        Self::new(tag, emoji)
    }

    pub fn for_strategy(strategy: FallbackStrategy) -> Self {
        let (tag, emoji) = match strategy {
            FallbackStrategy::Series => ("SERIES", "🔗"),
            FallbackStrategy::Sequential => ("SEQUENTIAL", "🪜"),
            FallbackStrategy::Parallel => ("PARALLEL", "🔀"),
        };
        Self::new(tag, emoji)
    }

    fn new(tag: &'static str, emoji: &'static str) -> Self {
        Self {
            tag,
            emoji,
            start_time: Instant::now(),
        }
    }

    pub fn log_start(&self, run_id: &str, detail: &str) {
        info!(
            "[{}] {} 🚀 Starting {} (run ID: {}) - {}",
            self.tag,
            self.emoji,
            self.tag.to_lowercase(),
            run_id,
            detail
        );
    }

    pub fn log_phase(&self, phase: &str, details: Option<&str>) {
        let elapsed = self.start_time.elapsed();
        let msg = if let Some(details) = details {
            format!(
                "[{}] {} 🔄 Phase: {} - {} [+{:.1}s]",
                self.tag, self.emoji, phase, details, elapsed.as_secs_f32()
            )
        } else {
            format!(
                "[{}] {} 🔄 Phase: {} [+{:.1}s]",
                self.tag, self.emoji, phase, elapsed.as_secs_f32()
            )
        };
        info!("{}", msg);
    }

    pub fn log_data_loaded(&self, count: usize, data_type: &str) {
        info!("[{}] {} 📊 Loaded {} {}", self.tag, self.emoji, count, data_type);
    }

    pub fn log_run_stats(&self, stats: &MatchRunStats) {
        info!(
            "[{}] {} 🎉 COMPLETED: {} records in {:.2?}",
            self.tag,
            self.emoji,
            stats.total,
            self.start_time.elapsed()
        );
        info!(
            "[{}] {} 📊 Results: {} hierarchical, {} fallback, {} unmatched \
             ({:.1}% matched, avg confidence {:.3})",
            self.tag,
            self.emoji,
            stats.hierarchical_successes,
            stats.fallback_successes,
            stats.unmatched,
            stats.match_rate(),
            stats.avg_confidence
        );
        for (method, count) in &stats.method_counts {
            debug!("[{}] {}    • {}: {}", self.tag, self.emoji, method, count);
        }
        if !stats.manual_review_indices.is_empty() {
            warn!(
                "[{}] {} 🧑‍⚖️  {} records routed to manual review",
                self.tag,
                self.emoji,
                stats.manual_review_indices.len()
            );
        }
    }

    pub fn log_strategy_result(&self, result: &FallbackTestResult) {
        info!(
            "[{}] {} ✅ {}/{} matched ({:.1}%: {} hierarchical, {} fallback), avg {:.3} ms/case",
            self.tag,
            self.emoji,
            result.successes,
            result.total_tests,
            result.match_rate,
            result.hierarchical_successes,
            result.fallback_successes,
            result.average_time_ms
        );
        if let Some(accuracy) = result.accuracy {
            info!(
                "[{}] {} 🎯 Accuracy on {} labeled cases: {:.1}%",
                self.tag, self.emoji, result.labeled_cases, accuracy
            );
        }
    }

    pub fn log_warning(&self, message: &str) {
        warn!("[{}] {} ⚠️  {}", self.tag, self.emoji, message);
    }

    pub fn log_debug(&self, message: &str) {
        debug!("[{}] {} {}", self.tag, self.emoji, message);
    }

    pub fn log_progress_update(
        &self,
        current: usize,
        total: usize,
        additional_info: Option<&str>,
    ) {
        if should_log_progress(current, total) {
            let percent = (current as f64 / total as f64) * 100.0;
            let msg = if let Some(info) = additional_info {
                format!("Progress: {}/{} ({:.1}%) - {}", current, total, percent, info)
            } else {
                format!("Progress: {}/{} ({:.1}%)", current, total, percent)
            };
            info!("[{}] {} 📊 {}", self.tag, self.emoji, msg);
        }
    }

    pub fn get_elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// Every 5000 items, at each 10% milestone, and at the end.
fn should_log_progress(current: usize, total: usize) -> bool {
    if current == 0 || total == 0 {
        return false;
    }
    current % 5000 == 0 || current == total || (total >= 100 && current % (total / 10) == 0)
}

pub fn log_ranking(ranked: &[FallbackTestResult]) {
    info!("🏆 ===== FALLBACK STRATEGY RANKING =====");
    for (pos, result) in ranked.iter().enumerate() {
        info!(
            "   {}. {:<10} {:>6.2}% matched, {:>8.3} ms/case, {} failures",
            pos + 1,
            result.strategy.as_str(),
            result.match_rate,
            result.average_time_ms,
            result.failures()
        );
    }
    info!("========================================");
}
