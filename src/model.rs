//! Aggregate model state
//!
//! Bundles everything the learning loop accumulates outside the
//! network weights: strategy statistics, pattern success tracking,
//! user-preference counters and bookkeeping. Persisted as its own
//! JSON document, independent of the network and the trade history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::strategy::{ConditionRecord, StrategyBook, StrategyRecord};

/// Success tracking for one named chart pattern.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PatternRecord {
    pub observations: usize,
    pub successes: usize,
    pub success_rate: f64,
}

impl PatternRecord {
    pub fn record(&mut self, success: bool) {
        self.observations += 1;
        if success {
            self.successes += 1;
        }
        self.success_rate = self.successes as f64 / self.observations as f64;
    }
}

/// Counters of what the user has historically gravitated toward.
/// Fed by `record_selection` only; append-only.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PreferenceState {
    pub strategy_counts: HashMap<String, usize>,
    pub sector_counts: HashMap<String, usize>,
    pub total_selections: usize,
}

impl PreferenceState {
    pub fn record_selection(&mut self, strategies: &[String], sector: Option<&str>) {
        for s in strategies {
            *self.strategy_counts.entry(s.clone()).or_insert(0) += 1;
        }
        if let Some(sector) = sector {
            *self.sector_counts.entry(sector.to_string()).or_insert(0) += 1;
        }
        self.total_selections += 1;
    }

    /// Affinity in [0, 1]: share of past selections involving any of
    /// the given strategies or the sector.
    pub fn affinity(&self, strategies: &[String], sector: Option<&str>) -> f64 {
        if self.total_selections == 0 {
            return 0.0;
        }
        let strategy_hits: usize = strategies
            .iter()
            .filter_map(|s| self.strategy_counts.get(s))
            .sum();
        let sector_hits = sector
            .and_then(|s| self.sector_counts.get(s))
            .copied()
            .unwrap_or(0);
        let total = self.total_selections as f64;
        ((strategy_hits as f64 / total) * 0.7 + (sector_hits as f64 / total) * 0.3).min(1.0)
    }
}

/// Aggregate root for the non-network learned state.
///
/// Loaded at process start, mutated in place by outcome events, saved
/// after every mutation. New fields must carry `#[serde(default)]` so
/// older persisted documents still load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelState {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub strategies: StrategyBook,
    #[serde(default)]
    pub patterns: HashMap<String, PatternRecord>,
    #[serde(default)]
    pub preferences: PreferenceState,
    #[serde(default)]
    pub total_trades: usize,
    #[serde(default)]
    pub total_wins: usize,
    #[serde(default)]
    pub win_rate: f64,
    #[serde(default)]
    pub last_trained: Option<DateTime<Utc>>,
}

fn default_version() -> String {
    "1".to_string()
}

impl Default for ModelState {
    fn default() -> Self {
        Self {
            version: default_version(),
            strategies: StrategyBook::default(),
            patterns: HashMap::new(),
            preferences: PreferenceState::default(),
            total_trades: 0,
            total_wins: 0,
            win_rate: 0.0,
            last_trained: None,
        }
    }
}

impl ModelState {
    pub fn record_trade_result(&mut self, success: bool) {
        self.total_trades += 1;
        if success {
            self.total_wins += 1;
        }
        self.win_rate = self.total_wins as f64 / self.total_trades as f64;
        self.last_trained = Some(Utc::now());
    }

    pub fn record_pattern_outcomes(&mut self, patterns: &[String], success: bool) {
        for name in patterns {
            self.patterns.entry(name.clone()).or_default().record(success);
        }
    }

    /// Historical success multiplier for a pattern's nominal
    /// confidence: neutral 1.0 until enough observations, then the
    /// ratio of observed success to the 50% baseline, bounded.
    pub fn pattern_bias(&self, pattern_key: &str) -> f64 {
        match self.patterns.get(pattern_key) {
            Some(record) if record.observations >= 5 => {
                (record.success_rate / 0.5).clamp(0.5, 1.5)
            }
            _ => 1.0,
        }
    }
}

/// Snapshot returned by `model_stats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelStats {
    pub accuracy: f64,
    pub confidence: f64,
    pub training_samples: usize,
    pub total_trades: usize,
    pub win_rate: f64,
    pub last_trained: Option<DateTime<Utc>>,
    pub strategies: Vec<StrategyRecord>,
    /// Mean win rate across qualified strategies (0.5 when none)
    pub average_win_rate: f64,
    pub best_strategy: Option<String>,
    pub worst_strategy: Option<String>,
    pub conditions: HashMap<String, ConditionRecord>,
    pub patterns: HashMap<String, PatternRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_record_rates() {
        let mut record = PatternRecord::default();
        record.record(true);
        record.record(true);
        record.record(false);
        assert_eq!(record.observations, 3);
        assert!((record.success_rate - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_pattern_bias_neutral_until_observed() {
        let mut model = ModelState::default();
        assert_eq!(model.pattern_bias("golden_cross"), 1.0);

        for _ in 0..6 {
            model.record_pattern_outcomes(&["golden_cross".to_string()], true);
        }
        assert!(model.pattern_bias("golden_cross") > 1.0);
        assert!(model.pattern_bias("golden_cross") <= 1.5);
    }

    #[test]
    fn test_preference_affinity() {
        let mut prefs = PreferenceState::default();
        assert_eq!(prefs.affinity(&["x".to_string()], None), 0.0);

        prefs.record_selection(&["options_flow".to_string()], Some("tech"));
        prefs.record_selection(&["options_flow".to_string()], Some("energy"));

        let affinity = prefs.affinity(&["options_flow".to_string()], Some("tech"));
        assert!(affinity > 0.5);

        let other = prefs.affinity(&["unseen".to_string()], Some("finance"));
        assert_eq!(other, 0.0);
    }

    #[test]
    fn test_bookkeeping() {
        let mut model = ModelState::default();
        model.record_trade_result(true);
        model.record_trade_result(false);
        assert_eq!(model.total_trades, 2);
        assert_eq!(model.win_rate, 0.5);
        assert!(model.last_trained.is_some());
    }
}
