//! Core types used throughout the learning core
//!
//! Defines the shared data structures for market observations, trade
//! opportunities, trade outcomes and market-condition classification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Recommended action, ordered from most bullish to most bearish.
///
/// The scoring network's output layer is a probability distribution
/// over these five classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    StrongBuy,
    Buy,
    Hold,
    Sell,
    StrongSell,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::StrongBuy,
        Action::Buy,
        Action::Hold,
        Action::Sell,
        Action::StrongSell,
    ];

    /// Index of this action in the network's output layer.
    pub fn index(&self) -> usize {
        match self {
            Action::StrongBuy => 0,
            Action::Buy => 1,
            Action::Hold => 2,
            Action::Sell => 3,
            Action::StrongSell => 4,
        }
    }

    pub fn from_index(idx: usize) -> Action {
        Self::ALL.get(idx).copied().unwrap_or(Action::Hold)
    }

    /// Bucket a realized percent return into a training target class.
    pub fn from_return_pct(return_pct: f64) -> Action {
        if return_pct > 10.0 {
            Action::StrongBuy
        } else if return_pct > 3.0 {
            Action::Buy
        } else if return_pct >= -3.0 {
            Action::Hold
        } else if return_pct >= -10.0 {
            Action::Sell
        } else {
            Action::StrongSell
        }
    }

    pub fn is_bullish(&self) -> bool {
        matches!(self, Action::StrongBuy | Action::Buy)
    }

    pub fn is_bearish(&self) -> bool {
        matches!(self, Action::Sell | Action::StrongSell)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::StrongBuy => "strong_buy",
            Action::Buy => "buy",
            Action::Hold => "hold",
            Action::Sell => "sell",
            Action::StrongSell => "strong_sell",
        };
        write!(f, "{}", s)
    }
}

/// Directional bias of a detected chart pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Bullish,
    Bearish,
    Neutral,
}

/// Market-condition bucket a trade was entered under.
///
/// Strategy performance is tracked per bucket so the tracker can tell
/// which signal sources work in which regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketCondition {
    Bullish,
    Bearish,
    Sideways,
    HighVolatility,
    LowVolatility,
}

impl MarketCondition {
    /// Stable string key for JSON maps (enum keys don't serialize as
    /// object keys).
    pub fn as_key(&self) -> &'static str {
        match self {
            MarketCondition::Bullish => "bullish",
            MarketCondition::Bearish => "bearish",
            MarketCondition::Sideways => "sideways",
            MarketCondition::HighVolatility => "high_volatility",
            MarketCondition::LowVolatility => "low_volatility",
        }
    }
}

/// Snapshot of market context captured when a trade is entered.
///
/// Required at entry: the outcome is correlated against this snapshot
/// when the trade completes, so an entry without context would produce
/// an unusable training example.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MarketContext {
    /// Percent price change over the recent window (e.g. 5 days)
    pub price_change_pct: f64,
    /// Current volume relative to average volume (1.0 = average)
    pub volume_ratio: f64,
    /// Annualized-ish volatility estimate (0.0 - 1.0+)
    pub volatility: f64,
    /// Sector tag, if known
    #[serde(default)]
    pub sector: Option<String>,
}

impl MarketContext {
    /// Classify the snapshot into a market-condition bucket.
    ///
    /// Volatility extremes (realized vol or a volume spike) take
    /// precedence over direction.
    pub fn condition(&self) -> MarketCondition {
        if self.volatility > 0.40 || self.volume_ratio > 2.5 {
            MarketCondition::HighVolatility
        } else if self.volatility > 0.0 && self.volatility < 0.12 && self.volume_ratio < 0.8 {
            MarketCondition::LowVolatility
        } else if self.price_change_pct > 2.0 {
            MarketCondition::Bullish
        } else if self.price_change_pct < -2.0 {
            MarketCondition::Bearish
        } else {
            MarketCondition::Sideways
        }
    }
}

/// Raw per-symbol market observation fed into the feature extractor.
///
/// Every field except the symbol is optional: a missing data source is
/// imputed as 0.0 in the resulting feature vector, never NaN.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MarketObservation {
    pub symbol: String,
    /// Close prices, oldest first
    #[serde(default)]
    pub price_history: Vec<f64>,
    /// Volumes aligned with `price_history`
    #[serde(default)]
    pub volume_history: Vec<f64>,
    /// RSI (0-100)
    #[serde(default)]
    pub rsi: Option<f64>,
    /// MACD histogram value
    #[serde(default)]
    pub macd_histogram: Option<f64>,
    /// News sentiment (-1.0 to 1.0)
    #[serde(default)]
    pub news_sentiment: Option<f64>,
    /// Social sentiment (-1.0 to 1.0)
    #[serde(default)]
    pub social_sentiment: Option<f64>,
    /// Options put/call volume ratio
    #[serde(default)]
    pub put_call_ratio: Option<f64>,
    /// Options volume relative to its average
    #[serde(default)]
    pub options_volume_ratio: Option<f64>,
    /// Relative strength of the symbol's sector (-1.0 to 1.0)
    #[serde(default)]
    pub sector_strength: Option<f64>,
    /// Advancers/decliners style breadth (-1.0 to 1.0)
    #[serde(default)]
    pub market_breadth: Option<f64>,
    /// Correlation to the index (-1.0 to 1.0)
    #[serde(default)]
    pub index_correlation: Option<f64>,
}

/// Candidate opportunity handed to the ranking engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opportunity {
    pub symbol: String,
    /// Names of the heuristic strategies that flagged this candidate
    pub strategies: Vec<String>,
    /// Non-learned heuristic score (0-100)
    pub composite_score: f64,
    #[serde(default)]
    pub sector: Option<String>,
    /// Market observation backing the candidate, when available.
    /// Without it the network contributes nothing to the score.
    #[serde(default)]
    pub observation: Option<MarketObservation>,
}

/// Opportunity after ranking, with the learned score breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedOpportunity {
    pub symbol: String,
    pub strategies: Vec<String>,
    pub composite_score: f64,
    /// Final score: composite + bonuses, clamped to [0, 100]
    pub ai_score: f64,
    /// Network's recommended action for this candidate
    pub action: Action,
    /// Network confidence in that action (0.0 - 1.0)
    pub confidence: f64,
    pub network_bonus: f64,
    pub strategy_bonus: f64,
    pub preference_bonus: f64,
}

/// Input to `record_entry`: an actual trade being opened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeEntry {
    pub symbol: String,
    pub strategies: Vec<String>,
    pub entry_price: f64,
    pub position_size: f64,
    /// Maximum tolerated loss, percent
    #[serde(default)]
    pub max_loss_pct: Option<f64>,
    /// Target gain, percent
    #[serde(default)]
    pub max_gain_pct: Option<f64>,
    /// Market context at entry (mandatory, see `MarketContext`)
    pub context: MarketContext,
    #[serde(default)]
    pub sector: Option<String>,
    /// Observation at entry; used to build the training feature vector
    #[serde(default)]
    pub observation: Option<MarketObservation>,
}

/// Input to `record_outcome`: the realized result of an active trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeOutcome {
    pub exit_price: f64,
    #[serde(default)]
    pub exit_date: Option<DateTime<Utc>>,
    /// Why the trade was closed ("target_hit", "stop_loss", "expired", ...)
    #[serde(default)]
    pub exit_reason: Option<String>,
}

/// Win/loss/breakeven classification of a completed trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeClass {
    Win,
    Loss,
    Breakeven,
}

impl OutcomeClass {
    /// Returns within ±1% count as breakeven, not as evidence either way.
    pub fn classify(return_pct: f64) -> OutcomeClass {
        if return_pct > 1.0 {
            OutcomeClass::Win
        } else if return_pct < -1.0 {
            OutcomeClass::Loss
        } else {
            OutcomeClass::Breakeven
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_return_buckets() {
        assert_eq!(Action::from_return_pct(15.0), Action::StrongBuy);
        assert_eq!(Action::from_return_pct(5.0), Action::Buy);
        assert_eq!(Action::from_return_pct(0.0), Action::Hold);
        assert_eq!(Action::from_return_pct(-5.0), Action::Sell);
        assert_eq!(Action::from_return_pct(-20.0), Action::StrongSell);
    }

    #[test]
    fn test_action_bucket_edges() {
        assert_eq!(Action::from_return_pct(3.0), Action::Hold);
        assert_eq!(Action::from_return_pct(-3.0), Action::Hold);
        assert_eq!(Action::from_return_pct(10.0), Action::Buy);
        assert_eq!(Action::from_return_pct(-10.0), Action::Sell);
    }

    #[test]
    fn test_condition_classification() {
        let ctx = MarketContext {
            price_change_pct: 4.0,
            volume_ratio: 1.2,
            volatility: 0.2,
            sector: None,
        };
        assert_eq!(ctx.condition(), MarketCondition::Bullish);

        let ctx = MarketContext {
            price_change_pct: 4.0,
            volume_ratio: 1.0,
            volatility: 0.55,
            sector: None,
        };
        assert_eq!(ctx.condition(), MarketCondition::HighVolatility);

        let ctx = MarketContext {
            price_change_pct: 0.5,
            volume_ratio: 1.0,
            volatility: 0.2,
            sector: None,
        };
        assert_eq!(ctx.condition(), MarketCondition::Sideways);
    }

    #[test]
    fn test_outcome_classification() {
        assert_eq!(OutcomeClass::classify(8.0), OutcomeClass::Win);
        assert_eq!(OutcomeClass::classify(-4.0), OutcomeClass::Loss);
        assert_eq!(OutcomeClass::classify(0.3), OutcomeClass::Breakeven);
    }
}
