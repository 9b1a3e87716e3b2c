//! End-to-end tests for the learning engine operation set

use signalbrain::engine::LearningEngine;
use signalbrain::config::CoreConfig;
use signalbrain::error::CoreError;
use signalbrain::patterns::{detect_patterns, PatternKind};
use signalbrain::store::{docs, FileStore, MemoryStore};
use signalbrain::types::{
    Action, MarketContext, MarketObservation, Opportunity, TradeEntry, TradeOutcome,
};

fn engine() -> LearningEngine<MemoryStore> {
    LearningEngine::new(MemoryStore::new(), CoreConfig::default())
}

fn opportunity(symbol: &str, composite: f64, strategies: &[&str]) -> Opportunity {
    Opportunity {
        symbol: symbol.to_string(),
        strategies: strategies.iter().map(|s| s.to_string()).collect(),
        composite_score: composite,
        sector: Some("tech".to_string()),
        observation: None,
    }
}

fn entry(symbol: &str, price: f64, strategies: &[&str]) -> TradeEntry {
    TradeEntry {
        symbol: symbol.to_string(),
        strategies: strategies.iter().map(|s| s.to_string()).collect(),
        entry_price: price,
        position_size: 1000.0,
        max_loss_pct: Some(10.0),
        max_gain_pct: Some(25.0),
        context: MarketContext {
            price_change_pct: 3.5,
            volume_ratio: 1.3,
            volatility: 0.22,
            sector: Some("tech".to_string()),
        },
        sector: Some("tech".to_string()),
        observation: Some(MarketObservation {
            symbol: symbol.to_string(),
            price_history: (0..60).map(|i| price * (1.0 + i as f64 * 0.001)).collect(),
            volume_history: vec![1_000_000.0; 60],
            rsi: Some(58.0),
            ..Default::default()
        }),
    }
}

fn outcome(exit_price: f64) -> TradeOutcome {
    TradeOutcome {
        exit_price,
        exit_date: None,
        exit_reason: Some("target_hit".to_string()),
    }
}

#[test]
fn cold_start_ranking_matches_composite_order() {
    let engine = engine();
    let candidates = vec![
        opportunity("AAA", 55.0, &["a"]),
        opportunity("BBB", 88.0, &["b"]),
        opportunity("CCC", 70.0, &["c"]),
    ];
    let ranked = engine.rank_opportunities(&candidates);

    let symbols: Vec<&str> = ranked.iter().map(|r| r.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["BBB", "CCC", "AAA"]);
    for r in &ranked {
        assert_eq!(r.network_bonus, 0.0);
        assert_eq!(r.ai_score, r.composite_score);
    }
}

#[test]
fn unknown_trade_outcome_rejected_and_counts_unchanged() {
    let mut engine = engine();
    let before = engine.model_stats().total_trades;

    let err = engine
        .record_outcome("nonexistent-id", &outcome(100.0))
        .unwrap_err();
    assert!(matches!(err, CoreError::TradeNotFound(_)));
    assert_eq!(engine.model_stats().total_trades, before);
}

#[test]
fn outcome_is_terminal() {
    let mut engine = engine();
    let id = engine.record_entry(entry("AAPL", 100.0, &["momentum"])).unwrap();
    engine.record_outcome(&id, &outcome(108.0)).unwrap();

    let err = engine.record_outcome(&id, &outcome(90.0)).unwrap_err();
    assert!(matches!(err, CoreError::TradeAlreadyCompleted(_)));
    assert_eq!(engine.model_stats().total_trades, 1);
}

#[test]
fn winning_strategy_weight_rises_above_neutral() {
    let mut engine = engine();

    // 5 outcomes for ttm_squeeze: 4 wins around +8%, 1 loss
    for i in 0..5 {
        let id = engine
            .record_entry(entry("TSLA", 100.0, &["ttm_squeeze"]))
            .unwrap();
        let exit = if i == 0 { 94.0 } else { 108.0 };
        engine.record_outcome(&id, &outcome(exit)).unwrap();
    }

    let stats = engine.model_stats();
    let record = stats
        .strategies
        .iter()
        .find(|s| s.name == "ttm_squeeze")
        .expect("strategy should be tracked");
    assert_eq!(record.trades, 5);
    assert_eq!(record.wins, 4);
    assert!(record.weight > 1.0 && record.weight <= 2.0, "weight={}", record.weight);
}

#[test]
fn outcomes_update_stats_and_training_samples() {
    let mut engine = engine();
    let id = engine.record_entry(entry("NVDA", 200.0, &["gamma"])).unwrap();
    let stats = engine.record_outcome(&id, &outcome(230.0)).unwrap();

    assert_eq!(stats.total_trades, 1);
    assert_eq!(stats.win_rate, 1.0);
    assert_eq!(stats.training_samples, 1);
    assert!(stats.last_trained.is_some());
    assert!(stats.conditions.contains_key("bullish"));
}

#[test]
fn selection_feeds_preferences_and_promotes_on_entry() {
    let mut engine = engine();
    let opp = opportunity("AMD", 75.0, &["options_flow"]);
    engine.record_selection(&opp).unwrap();
    assert_eq!(engine.model().preferences.total_selections, 1);

    // Same symbol entered: the proposed record promotes, not duplicates
    let id = engine.record_entry(entry("AMD", 120.0, &["options_flow"])).unwrap();
    assert_eq!(engine.trades().records().len(), 1);
    engine.record_outcome(&id, &outcome(130.0)).unwrap();

    // Preference now biases ranking for the selected strategy
    let ranked = engine.rank_opportunities(&[
        opportunity("FAV", 50.0, &["options_flow"]),
        opportunity("OTHER", 50.0, &["unseen"]),
    ]);
    assert_eq!(ranked[0].symbol, "FAV");
    assert!(ranked[0].preference_bonus > 0.0);
}

#[test]
fn repeated_selection_keeps_single_proposal() {
    let mut engine = engine();
    let opp = opportunity("AMD", 75.0, &["options_flow"]);
    let first = engine.record_selection(&opp).unwrap();
    let second = engine.record_selection(&opp).unwrap();

    // Same proposal refreshed, not duplicated; every selection still
    // counts as a preference signal
    assert_eq!(first, second);
    assert_eq!(engine.trades().records().len(), 1);
    assert_eq!(engine.model().preferences.total_selections, 2);
}

#[test]
fn entry_without_positive_price_rejected() {
    let mut engine = engine();
    let mut bad = entry("AAPL", 100.0, &["x"]);
    bad.entry_price = -5.0;
    assert!(matches!(
        engine.record_entry(bad),
        Err(CoreError::InvalidEntry(_))
    ));
}

#[test]
fn persistence_round_trip_preserves_stats() {
    let dir = std::env::temp_dir().join(format!("signalbrain-test-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);

    let before;
    {
        let store = FileStore::new(&dir).unwrap();
        let mut engine = LearningEngine::new(store, CoreConfig::default());
        for i in 0..4 {
            let id = engine
                .record_entry(entry("MSFT", 100.0, &["breakout"]))
                .unwrap();
            let exit = if i % 2 == 0 { 106.0 } else { 97.0 };
            engine.record_outcome(&id, &outcome(exit)).unwrap();
        }
        before = engine.model_stats();
    }

    let store = FileStore::new(&dir).unwrap();
    let engine = LearningEngine::new(store, CoreConfig::default());
    let after = engine.model_stats();

    assert_eq!(before.accuracy, after.accuracy);
    assert_eq!(before.confidence, after.confidence);
    assert_eq!(before.training_samples, after.training_samples);
    assert_eq!(before.total_trades, after.total_trades);
    assert_eq!(before.win_rate, after.win_rate);
    assert_eq!(before.last_trained, after.last_trained);
    assert_eq!(before.strategies.len(), after.strategies.len());
    assert_eq!(before.average_win_rate, after.average_win_rate);
    assert_eq!(before.best_strategy, after.best_strategy);
    assert_eq!(before.worst_strategy, after.worst_strategy);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn corrupt_store_degrades_to_cold_model() {
    let store = MemoryStore::new();
    store.poison(docs::MODEL);
    store.poison(docs::NETWORK);

    let engine = LearningEngine::new(store, CoreConfig::default());
    let stats = engine.model_stats();
    assert_eq!(stats.total_trades, 0);
    assert_eq!(stats.training_samples, 0);
    assert_eq!(stats.accuracy, 0.5);
}

#[test]
fn pattern_scan_is_deterministic_on_golden_cross_series() {
    // 50/200 SMA crossover needs a 200+ point series; the jump at the
    // end puts the cross inside the detector's lookback
    let mut prices = vec![100.0; 202];
    prices.extend([200.0, 200.0, 200.0]);

    let first = detect_patterns(&prices);
    let second = detect_patterns(&prices);

    assert!(first.contains(PatternKind::GoldenCross));
    let kinds_a: Vec<_> = first.matches.iter().map(|m| m.kind).collect();
    let kinds_b: Vec<_> = second.matches.iter().map(|m| m.kind).collect();
    assert_eq!(kinds_a, kinds_b);
    assert_eq!(first.max_confidence, second.max_confidence);
}

#[test]
fn network_bonus_activates_after_cold_start() {
    let mut engine = engine();

    // Default cold-start threshold is 10 completed trades
    for _ in 0..12 {
        let id = engine.record_entry(entry("SPY", 100.0, &["trend"])).unwrap();
        engine.record_outcome(&id, &outcome(107.0)).unwrap();
    }

    let mut opp = opportunity("SPY", 50.0, &["trend"]);
    opp.observation = Some(MarketObservation {
        symbol: "SPY".to_string(),
        price_history: (0..60).map(|i| 100.0 * (1.0 + i as f64 * 0.001)).collect(),
        volume_history: vec![1_000_000.0; 60],
        rsi: Some(58.0),
        ..Default::default()
    });
    let ranked = engine.rank_opportunities(&[opp]);
    // Warm model with an observation: the network's verdict is
    // reported, and a directional verdict carries a nonzero bonus
    assert!(ranked[0].confidence > 0.0);
    if ranked[0].action != Action::Hold {
        assert_ne!(ranked[0].network_bonus, 0.0);
    }
}
