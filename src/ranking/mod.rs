//! Ranking / Recommendation Engine
//!
//! Combines the heuristic composite score with three learned bonuses:
//! network confidence (directional, 0 under cold start), strategy
//! weight (bounded +-10 points) and user preference (bounded <= 10
//! points). Ordering is fully deterministic: score desc, then
//! detecting-strategy count desc (multi-confirmation preferred), then
//! symbol asc.

use std::cmp::Ordering;
use tracing::debug;

use crate::config::CoreConfig;
use crate::features::{extract_features, F_PATTERN_CONFIDENCE};
use crate::model::ModelState;
use crate::network::{Inference, NetworkState};
use crate::patterns::{detect_patterns, PatternScan};
use crate::types::{Opportunity, RankedOpportunity};

/// Rank candidates by AI score. Pure with respect to the model: no
/// state is mutated.
pub fn rank_opportunities(
    candidates: &[Opportunity],
    network: &NetworkState,
    model: &ModelState,
    config: &CoreConfig,
) -> Vec<RankedOpportunity> {
    let cold_start = network.training_samples < config.ranking.min_trades_for_network;
    if cold_start {
        debug!(
            samples = network.training_samples,
            needed = config.ranking.min_trades_for_network,
            "cold start: ranking is heuristic-only"
        );
    }

    let mut ranked: Vec<RankedOpportunity> = candidates
        .iter()
        .map(|c| score_candidate(c, network, model, config, cold_start))
        .collect();

    ranked.sort_by(|a, b| {
        b.ai_score
            .partial_cmp(&a.ai_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.strategies.len().cmp(&a.strategies.len()))
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
    ranked
}

fn score_candidate(
    candidate: &Opportunity,
    network: &NetworkState,
    model: &ModelState,
    config: &CoreConfig,
    cold_start: bool,
) -> RankedOpportunity {
    let (features, inference) = match &candidate.observation {
        Some(obs) => {
            let scan = detect_patterns(&obs.price_history);
            let mut features = extract_features(obs, &scan);
            features.set(F_PATTERN_CONFIDENCE, biased_confidence(&scan, model));
            let inference = network.infer_features(&features);
            (Some(features), inference)
        }
        None => (None, Inference::neutral()),
    };

    // Cold start or no observation: the network explicitly contributes
    // nothing and ranking degrades to heuristics.
    let network_bonus = if cold_start || features.is_none() {
        0.0
    } else {
        directional_bonus(&inference, config.ranking.network_bonus_scale)
    };

    let strategy_bonus = strategy_bonus(candidate, model, config);
    let preference_bonus = model
        .preferences
        .affinity(&candidate.strategies, candidate.sector.as_deref())
        * config.ranking.preference_bonus_cap;

    let ai_score =
        (candidate.composite_score + network_bonus + strategy_bonus + preference_bonus)
            .clamp(0.0, 100.0);

    RankedOpportunity {
        symbol: candidate.symbol.clone(),
        strategies: candidate.strategies.clone(),
        composite_score: candidate.composite_score,
        ai_score,
        action: inference.action,
        confidence: inference.confidence,
        network_bonus,
        strategy_bonus,
        preference_bonus,
    }
}

/// Pattern confidence for the feature vector, biased by each pattern's
/// observed success rate.
fn biased_confidence(scan: &PatternScan, model: &ModelState) -> f64 {
    scan.matches
        .iter()
        .map(|m| (m.confidence * model.pattern_bias(m.kind.as_key())).clamp(0.0, 1.0))
        .fold(if scan.matches.is_empty() { 0.5 } else { 0.0 }, f64::max)
}

/// Signed bonus from the network's action distribution: bullish
/// confidence adds points, bearish subtracts, hold is neutral.
fn directional_bonus(inference: &Inference, scale: f64) -> f64 {
    if inference.action.is_bullish() {
        inference.confidence * scale
    } else if inference.action.is_bearish() {
        -(inference.confidence * scale)
    } else {
        0.0
    }
}

/// Mean strategy weight mapped to points: above-average strategies
/// (weight > 1.0) add up to the cap, below-average subtract.
fn strategy_bonus(candidate: &Opportunity, model: &ModelState, config: &CoreConfig) -> f64 {
    if candidate.strategies.is_empty() {
        return 0.0;
    }
    let mean_weight: f64 = candidate
        .strategies
        .iter()
        .map(|s| model.strategies.weight_for(s))
        .sum::<f64>()
        / candidate.strategies.len() as f64;

    ((mean_weight - 1.0) * config.ranking.strategy_bonus_cap).clamp(
        -config.ranking.strategy_bonus_cap,
        config.ranking.strategy_bonus_cap,
    )
}
