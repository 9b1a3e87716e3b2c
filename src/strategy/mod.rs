//! Strategy Performance Tracker
//!
//! Tracks rolling win/loss/return statistics per named signal source
//! ("strategy") and per market-condition bucket, and derives the
//! per-strategy weight multipliers used during ranking.
//!
//! Weights are a bounded ratio of the strategy's win rate to the
//! average win rate across strategies, clamped to [0.1, 2.0], so an
//! early lucky or unlucky streak can neither dominate the ranking nor
//! zero a strategy out. Strategies with fewer than `min_trades`
//! outcomes stay at the neutral 1.0.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::StrategyConfig;
use crate::types::MarketCondition;

/// Rolling statistics for a single named strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyRecord {
    pub name: String,
    pub trades: usize,
    pub wins: usize,
    /// wins / trades (0.0 until the first outcome)
    pub win_rate: f64,
    /// Rolling mean percent return across outcomes
    pub avg_return: f64,
    /// Ranking weight multiplier, clamped to [0.1, 2.0]
    pub weight: f64,
    pub last_updated: i64,
}

impl StrategyRecord {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            trades: 0,
            wins: 0,
            win_rate: 0.0,
            avg_return: 0.0,
            weight: 1.0,
            last_updated: 0,
        }
    }

    fn record(&mut self, success: bool, return_pct: f64) {
        // Incremental mean keeps the record O(1) per outcome
        self.avg_return =
            (self.avg_return * self.trades as f64 + return_pct) / (self.trades + 1) as f64;
        self.trades += 1;
        if success {
            self.wins += 1;
        }
        self.win_rate = self.wins as f64 / self.trades as f64;
        self.last_updated = chrono::Utc::now().timestamp();
    }
}

/// Win/loss statistics for one market-condition bucket.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConditionRecord {
    pub trades: usize,
    pub wins: usize,
    pub win_rate: f64,
    pub avg_return: f64,
}

impl ConditionRecord {
    fn record(&mut self, success: bool, return_pct: f64) {
        self.avg_return =
            (self.avg_return * self.trades as f64 + return_pct) / (self.trades + 1) as f64;
        self.trades += 1;
        if success {
            self.wins += 1;
        }
        self.win_rate = self.wins as f64 / self.trades as f64;
    }
}

/// The tracker: per-strategy and per-condition statistics.
///
/// Keyed by plain strings so the whole structure serializes as JSON
/// objects without a key-mapping step.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StrategyBook {
    pub strategies: HashMap<String, StrategyRecord>,
    pub conditions: HashMap<String, ConditionRecord>,
}

impl StrategyBook {
    /// Record a terminal outcome against every strategy that flagged
    /// the trade, plus the market-condition bucket it was entered
    /// under, then re-derive weights.
    pub fn record_outcome(
        &mut self,
        strategy_names: &[String],
        success: bool,
        return_pct: f64,
        condition: MarketCondition,
        config: &StrategyConfig,
    ) {
        for name in strategy_names {
            let record = self
                .strategies
                .entry(name.clone())
                .or_insert_with(|| StrategyRecord::new(name));
            record.record(success, return_pct);
        }
        self.conditions
            .entry(condition.as_key().to_string())
            .or_default()
            .record(success, return_pct);

        self.derive_weights(config);
    }

    /// Recompute every qualified strategy's weight:
    /// clamp(win_rate / mean_win_rate, floor, ceiling).
    ///
    /// The mean blends in a 0.5 coin-flip baseline as one pseudo
    /// strategy, so a lone tracked strategy still differentiates from
    /// neutral instead of always dividing by its own win rate.
    pub fn derive_weights(&mut self, config: &StrategyConfig) {
        let qualified: Vec<f64> = self
            .strategies
            .values()
            .filter(|s| s.trades >= config.min_trades)
            .map(|s| s.win_rate)
            .collect();

        if qualified.is_empty() {
            return;
        }
        let mean =
            (qualified.iter().sum::<f64>() + 0.5) / (qualified.len() as f64 + 1.0);

        for record in self.strategies.values_mut() {
            if record.trades < config.min_trades {
                record.weight = 1.0;
            } else if mean > 0.0 {
                record.weight =
                    (record.win_rate / mean).clamp(config.weight_floor, config.weight_ceiling);
            } else {
                // No strategy has won yet; everyone stays at the floor's
                // neutral side rather than dividing by zero
                record.weight = 1.0;
            }
        }
    }

    /// Weight multiplier for a strategy (neutral 1.0 when unknown).
    pub fn weight_for(&self, name: &str) -> f64 {
        self.strategies.get(name).map(|s| s.weight).unwrap_or(1.0)
    }

    /// Mean win rate across qualified strategies (0.5 when none).
    pub fn average_win_rate(&self, min_trades: usize) -> f64 {
        let qualified: Vec<f64> = self
            .strategies
            .values()
            .filter(|s| s.trades >= min_trades)
            .map(|s| s.win_rate)
            .collect();
        if qualified.is_empty() {
            0.5
        } else {
            qualified.iter().sum::<f64>() / qualified.len() as f64
        }
    }

    pub fn best_strategy(&self, min_trades: usize) -> Option<&StrategyRecord> {
        self.strategies
            .values()
            .filter(|s| s.trades >= min_trades)
            .max_by(|a, b| {
                a.win_rate
                    .partial_cmp(&b.win_rate)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    pub fn worst_strategy(&self, min_trades: usize) -> Option<&StrategyRecord> {
        self.strategies
            .values()
            .filter(|s| s.trades >= min_trades)
            .min_by(|a, b| {
                a.win_rate
                    .partial_cmp(&b.win_rate)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }
}
