//! Configuration for the learning core
//!
//! Plain serde structs with defaults; an optional JSON file can
//! override any subset of fields thanks to `#[serde(default)]`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Top-level configuration, grouped by component.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CoreConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Online learning rate. Small on purpose: one bounded update per
    /// trade outcome keeps weights from diverging.
    pub learning_rate: f64,
    /// Cap on the retained training-example buffer (oldest evicted)
    pub buffer_cap: usize,
    /// Window of recent examples used for the accuracy estimate
    pub accuracy_window: usize,
    /// Recompute accuracy every N training examples
    pub accuracy_every: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            buffer_cap: 1000,
            accuracy_window: 100,
            accuracy_every: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Minimum completed trades before a strategy's weight deviates
    /// from neutral 1.0
    pub min_trades: usize,
    /// Weight multiplier clamp bounds
    pub weight_floor: f64,
    pub weight_ceiling: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            min_trades: 3,
            weight_floor: 0.1,
            weight_ceiling: 2.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Completed trades required before the network bonus applies;
    /// below this the ranking is heuristic-only (cold start)
    pub min_trades_for_network: usize,
    /// Scale of the network-confidence bonus in score points
    pub network_bonus_scale: f64,
    /// Bound on the strategy-weight bonus, ± points
    pub strategy_bonus_cap: f64,
    /// Upper bound on the user-preference bonus, points
    pub preference_bonus_cap: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            min_trades_for_network: 10,
            network_bonus_scale: 10.0,
            strategy_bonus_cap: 10.0,
            preference_bonus_cap: 10.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Returns within ± this percent classify as breakeven
    pub breakeven_band_pct: f64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            breakeven_band_pct: 1.0,
        }
    }
}

impl CoreConfig {
    /// Load configuration from a JSON file, falling back to defaults
    /// for any missing section.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: CoreConfig = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }
}
