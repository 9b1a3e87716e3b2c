//! Learning Engine - the public operation set
//!
//! Facade over the learning core: ranking, selection/entry/outcome
//! recording and the stats snapshot. The store is injected so callers
//! (and tests) choose file-backed or in-memory persistence per
//! instance; there is no hidden global.
//!
//! Concurrency contract: the engine is single-writer. Every mutating
//! operation fully updates its in-memory fields before returning, but
//! there is no internal locking and no transaction across operations;
//! callers that share an engine must serialize writes externally
//! (e.g. behind a queue). Persistence runs last in every mutating
//! operation, so the durable snapshot is always a fully-applied state.

use tracing::{info, warn};

use crate::config::CoreConfig;
use crate::error::CoreResult;
use crate::features::{
    extract_features, FeatureVector, F_MOMENTUM, F_PATTERN_CONFIDENCE, F_VOLATILITY,
    F_VOLUME_RATIO,
};
use crate::lifecycle::TradeBook;
use crate::model::{ModelState, ModelStats};
use crate::network::{NetworkState, TrainingExample};
use crate::patterns::detect_patterns;
use crate::ranking;
use crate::store::ModelStore;
use crate::types::{Opportunity, RankedOpportunity, TradeEntry, TradeOutcome};

pub struct LearningEngine<S: ModelStore> {
    config: CoreConfig,
    store: S,
    network: NetworkState,
    model: ModelState,
    trades: TradeBook,
}

impl<S: ModelStore> LearningEngine<S> {
    /// Load all state from the store, falling back to freshly
    /// initialized defaults per document on a missing or corrupt read.
    /// The dashboard must stay operable with a cold model, so load
    /// failures degrade instead of propagating.
    pub fn new(store: S, config: CoreConfig) -> Self {
        let network = match store.load_network() {
            Ok(Some(network)) => network,
            Ok(None) => {
                info!("no persisted network state, starting cold");
                NetworkState::new()
            }
            Err(e) => {
                warn!(error = %e, "network state unreadable, starting cold");
                NetworkState::new()
            }
        };
        let model = match store.load_model() {
            Ok(Some(model)) => model,
            Ok(None) => ModelState::default(),
            Err(e) => {
                warn!(error = %e, "model state unreadable, using defaults");
                ModelState::default()
            }
        };
        let trades = match store.load_trades() {
            Ok(Some(records)) => TradeBook::from_records(records),
            Ok(None) => TradeBook::default(),
            Err(e) => {
                warn!(error = %e, "trade history unreadable, starting empty");
                TradeBook::default()
            }
        };

        info!(
            trades = trades.records().len(),
            training_samples = network.training_samples,
            "learning engine ready"
        );
        Self {
            config,
            store,
            network,
            model,
            trades,
        }
    }

    /// Rank candidate opportunities. Read-only.
    pub fn rank_opportunities(&self, candidates: &[Opportunity]) -> Vec<RankedOpportunity> {
        ranking::rank_opportunities(candidates, &self.network, &self.model, &self.config)
    }

    /// Record that the user selected an opportunity. Pure preference
    /// signal: it biases future ranking but never trains the network.
    pub fn record_selection(&mut self, opportunity: &Opportunity) -> CoreResult<String> {
        let id = self.trades.record_selection(opportunity);
        self.model
            .preferences
            .record_selection(&opportunity.strategies, opportunity.sector.as_deref());
        self.persist();
        Ok(id)
    }

    /// Record an actual trade entry; returns the trade id.
    pub fn record_entry(&mut self, entry: TradeEntry) -> CoreResult<String> {
        let (features, patterns) = match &entry.observation {
            Some(obs) => {
                let scan = detect_patterns(&obs.price_history);
                let features = extract_features(obs, &scan);
                let patterns = scan.matches.iter().map(|m| m.kind.as_key().to_string()).collect();
                (features, patterns)
            }
            None => (context_features(&entry), Vec::new()),
        };

        let id = self.trades.record_entry(&entry, features, patterns)?;
        self.persist();
        Ok(id)
    }

    /// Record the terminal outcome of an active trade. Effect order is
    /// fixed: train the network, update strategy and pattern
    /// statistics, update bookkeeping, persist. Persisting last means
    /// a crash mid-update can only lose the whole event, never leave a
    /// half-applied snapshot durable.
    pub fn record_outcome(
        &mut self,
        trade_id: &str,
        outcome: &TradeOutcome,
    ) -> CoreResult<ModelStats> {
        let completed = self.trades.complete(
            trade_id,
            outcome,
            self.config.lifecycle.breakeven_band_pct,
        )?;

        self.network.train(
            TrainingExample::new(completed.features.clone(), completed.return_pct),
            &self.config.network,
        );
        self.model.strategies.record_outcome(
            &completed.strategies,
            completed.success,
            completed.return_pct,
            completed.condition,
            &self.config.strategy,
        );
        self.model
            .record_pattern_outcomes(&completed.patterns, completed.success);
        self.model.record_trade_result(completed.success);

        self.persist();
        Ok(self.model_stats())
    }

    /// Snapshot of model quality and per-strategy performance.
    pub fn model_stats(&self) -> ModelStats {
        let min_trades = self.config.strategy.min_trades;
        ModelStats {
            accuracy: self.network.accuracy,
            confidence: self.network.confidence,
            training_samples: self.network.training_samples,
            total_trades: self.model.total_trades,
            win_rate: self.model.win_rate,
            last_trained: self.model.last_trained,
            strategies: self.model.strategies.strategies.values().cloned().collect(),
            average_win_rate: self.model.strategies.average_win_rate(min_trades),
            best_strategy: self
                .model
                .strategies
                .best_strategy(min_trades)
                .map(|s| s.name.clone()),
            worst_strategy: self
                .model
                .strategies
                .worst_strategy(min_trades)
                .map(|s| s.name.clone()),
            conditions: self.model.strategies.conditions.clone(),
            patterns: self.model.patterns.clone(),
        }
    }

    pub fn network(&self) -> &NetworkState {
        &self.network
    }

    pub fn model(&self) -> &ModelState {
        &self.model
    }

    pub fn trades(&self) -> &TradeBook {
        &self.trades
    }

    /// Flush all three documents. Failures are logged, not raised: the
    /// in-memory state stays authoritative and the next successful
    /// flush catches up.
    fn persist(&self) {
        if let Err(e) = self.store.save_network(&self.network) {
            warn!(error = %e, "failed to persist network state");
        }
        if let Err(e) = self.store.save_model(&self.model) {
            warn!(error = %e, "failed to persist model state");
        }
        if let Err(e) = self.store.save_trades(self.trades.records()) {
            warn!(error = %e, "failed to persist trade history");
        }
    }
}

/// Degraded feature vector for entries without a full observation:
/// only the market-context slots carry signal. Enough to correlate
/// outcomes against entry conditions, though weaker than a full
/// observation.
fn context_features(entry: &TradeEntry) -> FeatureVector {
    let mut f = FeatureVector::default();
    f.set(F_MOMENTUM, (entry.context.price_change_pct / 20.0).clamp(-1.0, 1.0));
    f.set(
        F_VOLUME_RATIO,
        ((entry.context.volume_ratio - 1.0) / 2.0).clamp(-1.0, 1.0),
    );
    f.set(F_VOLATILITY, entry.context.volatility.clamp(0.0, 1.0));
    f.set(F_PATTERN_CONFIDENCE, 0.5);
    f
}
