//! Trade Lifecycle Tracker
//!
//! State machine for a trade: `Proposed -> Active -> Completed`, with
//! `Completed` terminal and irreversible. Proposals exist purely for
//! preference learning; only an active trade (with entry price and
//! market context) can receive an outcome, and that outcome is what
//! produces the labeled example the network trains on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::features::FeatureVector;
use crate::types::{
    MarketCondition, MarketContext, Opportunity, OutcomeClass, TradeEntry, TradeOutcome,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeStatus {
    Proposed,
    Active,
    Completed,
}

/// One proposed or executed trade.
///
/// Outcome fields (`exit_price`, `return_pct`, `success`, ...) are set
/// if and only if `status == Completed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: String,
    pub symbol: String,
    pub strategies: Vec<String>,
    pub status: TradeStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub sector: Option<String>,

    // Entry (set when Active)
    #[serde(default)]
    pub entry_price: Option<f64>,
    #[serde(default)]
    pub entry_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub position_size: Option<f64>,
    #[serde(default)]
    pub max_loss_pct: Option<f64>,
    #[serde(default)]
    pub max_gain_pct: Option<f64>,
    /// Market-condition context snapshot at entry
    #[serde(default)]
    pub context: Option<MarketContext>,
    /// Feature vector captured at entry, used as the training input
    /// once the outcome is known
    #[serde(default)]
    pub entry_features: Option<FeatureVector>,
    /// Chart patterns matched at entry (pattern-success tracking)
    #[serde(default)]
    pub patterns_at_entry: Vec<String>,

    // Outcome (set when Completed, never before)
    #[serde(default)]
    pub exit_price: Option<f64>,
    #[serde(default)]
    pub exit_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub return_pct: Option<f64>,
    #[serde(default)]
    pub days_held: Option<i64>,
    #[serde(default)]
    pub exit_reason: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
}

/// Terminal summary handed to the engine for training and tracker
/// updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedTrade {
    pub id: String,
    pub symbol: String,
    pub strategies: Vec<String>,
    pub return_pct: f64,
    pub days_held: i64,
    pub outcome: OutcomeClass,
    pub success: bool,
    pub condition: MarketCondition,
    pub features: FeatureVector,
    pub patterns: Vec<String>,
}

/// Append-only trade history with id lookup.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TradeBook {
    trades: Vec<TradeRecord>,
}

impl TradeBook {
    pub fn from_records(trades: Vec<TradeRecord>) -> Self {
        Self { trades }
    }

    pub fn records(&self) -> &[TradeRecord] {
        &self.trades
    }

    pub fn get(&self, id: &str) -> Option<&TradeRecord> {
        self.trades.iter().find(|t| t.id == id)
    }

    pub fn active_count(&self) -> usize {
        self.trades
            .iter()
            .filter(|t| t.status == TradeStatus::Active)
            .count()
    }

    pub fn completed_count(&self) -> usize {
        self.trades
            .iter()
            .filter(|t| t.status == TradeStatus::Completed)
            .count()
    }

    /// Record that the user selected an opportunity. Creates or
    /// updates a `Proposed` record: a preference signal only, never
    /// trained on. Re-selecting a symbol refreshes the existing
    /// proposal instead of stacking duplicates the entry promotion
    /// could never drain.
    pub fn record_selection(&mut self, opportunity: &Opportunity) -> String {
        if let Some(record) = self
            .trades
            .iter_mut()
            .rev()
            .find(|t| t.status == TradeStatus::Proposed && t.symbol == opportunity.symbol)
        {
            record.strategies = opportunity.strategies.clone();
            record.sector = opportunity.sector.clone().or(record.sector.take());
            record.created_at = Utc::now();
            return record.id.clone();
        }

        let id = Uuid::new_v4().to_string();
        self.trades.push(TradeRecord {
            id: id.clone(),
            symbol: opportunity.symbol.clone(),
            strategies: opportunity.strategies.clone(),
            status: TradeStatus::Proposed,
            created_at: Utc::now(),
            sector: opportunity.sector.clone(),
            entry_price: None,
            entry_date: None,
            position_size: None,
            max_loss_pct: None,
            max_gain_pct: None,
            context: None,
            entry_features: None,
            patterns_at_entry: Vec::new(),
            exit_price: None,
            exit_date: None,
            return_pct: None,
            days_held: None,
            exit_reason: None,
            success: None,
        });
        id
    }

    /// Record an actual trade entry. Promotes the most recent
    /// `Proposed` record for the symbol when one exists, otherwise
    /// creates a fresh record. Entry without a positive price or with
    /// degenerate fields is rejected: the record would be untrainable.
    pub fn record_entry(
        &mut self,
        entry: &TradeEntry,
        features: FeatureVector,
        patterns: Vec<String>,
    ) -> CoreResult<String> {
        if entry.symbol.trim().is_empty() {
            return Err(CoreError::InvalidEntry("symbol is empty".into()));
        }
        if !entry.entry_price.is_finite() || entry.entry_price <= 0.0 {
            return Err(CoreError::InvalidEntry(format!(
                "entry price must be positive, got {}",
                entry.entry_price
            )));
        }
        if !entry.position_size.is_finite() || entry.position_size <= 0.0 {
            return Err(CoreError::InvalidEntry(format!(
                "position size must be positive, got {}",
                entry.position_size
            )));
        }

        let existing = self
            .trades
            .iter_mut()
            .rev()
            .find(|t| t.status == TradeStatus::Proposed && t.symbol == entry.symbol);

        let id = match existing {
            Some(record) => {
                record.status = TradeStatus::Active;
                record.strategies = entry.strategies.clone();
                record.entry_price = Some(entry.entry_price);
                record.entry_date = Some(Utc::now());
                record.position_size = Some(entry.position_size);
                record.max_loss_pct = entry.max_loss_pct;
                record.max_gain_pct = entry.max_gain_pct;
                record.context = Some(entry.context.clone());
                record.entry_features = Some(features);
                record.patterns_at_entry = patterns;
                record.sector = entry.sector.clone().or(record.sector.take());
                record.id.clone()
            }
            None => {
                let id = Uuid::new_v4().to_string();
                self.trades.push(TradeRecord {
                    id: id.clone(),
                    symbol: entry.symbol.clone(),
                    strategies: entry.strategies.clone(),
                    status: TradeStatus::Active,
                    created_at: Utc::now(),
                    sector: entry.sector.clone(),
                    entry_price: Some(entry.entry_price),
                    entry_date: Some(Utc::now()),
                    position_size: Some(entry.position_size),
                    max_loss_pct: entry.max_loss_pct,
                    max_gain_pct: entry.max_gain_pct,
                    context: Some(entry.context.clone()),
                    entry_features: Some(features),
                    patterns_at_entry: patterns,
                    exit_price: None,
                    exit_date: None,
                    return_pct: None,
                    days_held: None,
                    exit_reason: None,
                    success: None,
                });
                id
            }
        };

        info!(trade_id = %id, symbol = %entry.symbol, "trade entered");
        Ok(id)
    }

    /// Close an active trade with its realized outcome. Only valid
    /// against an `Active` record; a completed trade can never
    /// transition again.
    pub fn complete(
        &mut self,
        trade_id: &str,
        outcome: &TradeOutcome,
        breakeven_band_pct: f64,
    ) -> CoreResult<CompletedTrade> {
        if !outcome.exit_price.is_finite() || outcome.exit_price <= 0.0 {
            return Err(CoreError::InvalidOutcome(format!(
                "exit price must be positive, got {}",
                outcome.exit_price
            )));
        }

        let record = match self.trades.iter_mut().find(|t| t.id == trade_id) {
            Some(r) => r,
            None => return Err(CoreError::TradeNotFound(trade_id.to_string())),
        };
        match record.status {
            TradeStatus::Completed => {
                return Err(CoreError::TradeAlreadyCompleted(trade_id.to_string()))
            }
            TradeStatus::Proposed => {
                return Err(CoreError::TradeNotFound(trade_id.to_string()))
            }
            TradeStatus::Active => {}
        }

        let entry_price = record
            .entry_price
            .ok_or_else(|| CoreError::TradeNotFound(trade_id.to_string()))?;
        let context = record.context.clone().unwrap_or_default();

        let exit_date = outcome.exit_date.unwrap_or_else(Utc::now);
        let return_pct = (outcome.exit_price - entry_price) / entry_price * 100.0;
        let days_held = record
            .entry_date
            .map(|d| (exit_date - d).num_days().max(0))
            .unwrap_or(0);

        let class = if return_pct > breakeven_band_pct {
            OutcomeClass::Win
        } else if return_pct < -breakeven_band_pct {
            OutcomeClass::Loss
        } else {
            OutcomeClass::Breakeven
        };
        let success = class == OutcomeClass::Win;

        record.status = TradeStatus::Completed;
        record.exit_price = Some(outcome.exit_price);
        record.exit_date = Some(exit_date);
        record.return_pct = Some(return_pct);
        record.days_held = Some(days_held);
        record.exit_reason = outcome.exit_reason.clone();
        record.success = Some(success);

        info!(
            trade_id = %trade_id,
            symbol = %record.symbol,
            return_pct,
            success,
            "trade completed"
        );

        Ok(CompletedTrade {
            id: record.id.clone(),
            symbol: record.symbol.clone(),
            strategies: record.strategies.clone(),
            return_pct,
            days_held,
            outcome: class,
            success,
            condition: context.condition(),
            features: record.entry_features.clone().unwrap_or_default(),
            patterns: record.patterns_at_entry.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(symbol: &str, price: f64) -> TradeEntry {
        TradeEntry {
            symbol: symbol.to_string(),
            strategies: vec!["ttm_squeeze".to_string()],
            entry_price: price,
            position_size: 1000.0,
            max_loss_pct: Some(10.0),
            max_gain_pct: Some(20.0),
            context: MarketContext {
                price_change_pct: 3.0,
                volume_ratio: 1.4,
                volatility: 0.2,
                sector: Some("tech".into()),
            },
            sector: Some("tech".into()),
            observation: None,
        }
    }

    #[test]
    fn test_entry_then_outcome() {
        let mut book = TradeBook::default();
        let id = book
            .record_entry(&entry("AAPL", 100.0), FeatureVector::default(), vec![])
            .unwrap();
        assert_eq!(book.active_count(), 1);

        let outcome = TradeOutcome {
            exit_price: 108.0,
            exit_date: None,
            exit_reason: Some("target_hit".into()),
        };
        let completed = book.complete(&id, &outcome, 1.0).unwrap();
        assert!((completed.return_pct - 8.0).abs() < 1e-9);
        assert!(completed.success);
        assert_eq!(completed.condition, MarketCondition::Bullish);
        assert_eq!(book.completed_count(), 1);
    }

    #[test]
    fn test_unknown_id_rejected() {
        let mut book = TradeBook::default();
        let outcome = TradeOutcome {
            exit_price: 100.0,
            exit_date: None,
            exit_reason: None,
        };
        let err = book.complete("nonexistent-id", &outcome, 1.0).unwrap_err();
        assert!(matches!(err, CoreError::TradeNotFound(_)));
    }

    #[test]
    fn test_completed_is_terminal() {
        let mut book = TradeBook::default();
        let id = book
            .record_entry(&entry("MSFT", 50.0), FeatureVector::default(), vec![])
            .unwrap();
        let outcome = TradeOutcome {
            exit_price: 45.0,
            exit_date: None,
            exit_reason: Some("stop_loss".into()),
        };
        book.complete(&id, &outcome, 1.0).unwrap();

        let err = book.complete(&id, &outcome, 1.0).unwrap_err();
        assert!(matches!(err, CoreError::TradeAlreadyCompleted(_)));
    }

    #[test]
    fn test_proposed_cannot_complete() {
        let mut book = TradeBook::default();
        let opp = Opportunity {
            symbol: "NVDA".into(),
            strategies: vec!["gamma".into()],
            composite_score: 70.0,
            sector: None,
            observation: None,
        };
        let id = book.record_selection(&opp);
        let outcome = TradeOutcome {
            exit_price: 100.0,
            exit_date: None,
            exit_reason: None,
        };
        assert!(matches!(
            book.complete(&id, &outcome, 1.0),
            Err(CoreError::TradeNotFound(_))
        ));
    }

    #[test]
    fn test_selection_promoted_on_entry() {
        let mut book = TradeBook::default();
        let opp = Opportunity {
            symbol: "AAPL".into(),
            strategies: vec!["options_flow".into()],
            composite_score: 80.0,
            sector: Some("tech".into()),
            observation: None,
        };
        let proposed_id = book.record_selection(&opp);
        let active_id = book
            .record_entry(&entry("AAPL", 100.0), FeatureVector::default(), vec![])
            .unwrap();
        assert_eq!(proposed_id, active_id);
        assert_eq!(book.records().len(), 1);
        assert_eq!(book.get(&active_id).unwrap().status, TradeStatus::Active);
    }

    #[test]
    fn test_reselection_updates_existing_proposal() {
        let mut book = TradeBook::default();
        let mut opp = Opportunity {
            symbol: "TSLA".into(),
            strategies: vec!["momentum".into()],
            composite_score: 70.0,
            sector: None,
            observation: None,
        };
        let first_id = book.record_selection(&opp);

        opp.strategies = vec!["momentum".into(), "options_flow".into()];
        opp.sector = Some("auto".into());
        let second_id = book.record_selection(&opp);

        assert_eq!(first_id, second_id);
        assert_eq!(book.records().len(), 1);
        let record = book.get(&first_id).unwrap();
        assert_eq!(record.status, TradeStatus::Proposed);
        assert_eq!(record.strategies.len(), 2);
        assert_eq!(record.sector.as_deref(), Some("auto"));
    }

    #[test]
    fn test_invalid_entry_rejected() {
        let mut book = TradeBook::default();
        let mut bad = entry("AAPL", 0.0);
        assert!(matches!(
            book.record_entry(&bad, FeatureVector::default(), vec![]),
            Err(CoreError::InvalidEntry(_))
        ));
        bad.entry_price = f64::NAN;
        assert!(matches!(
            book.record_entry(&bad, FeatureVector::default(), vec![]),
            Err(CoreError::InvalidEntry(_))
        ));
    }

    #[test]
    fn test_breakeven_band() {
        let mut book = TradeBook::default();
        let id = book
            .record_entry(&entry("SPY", 100.0), FeatureVector::default(), vec![])
            .unwrap();
        let outcome = TradeOutcome {
            exit_price: 100.5,
            exit_date: None,
            exit_reason: None,
        };
        let completed = book.complete(&id, &outcome, 1.0).unwrap();
        assert_eq!(completed.outcome, OutcomeClass::Breakeven);
        assert!(!completed.success);
    }
}
