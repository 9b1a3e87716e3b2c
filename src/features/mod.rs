//! Feature Extractor - market observation to network input
//!
//! Converts a raw per-symbol observation into the fixed 15-slot
//! normalized vector the scoring network consumes:
//! - slots 0-6: technical indicators
//! - slots 7-8: sentiment
//! - slots 9-10: options flow
//! - slots 11-14: market structure (incl. pattern confidence)
//!
//! Sanitation is a hard contract: missing sources impute 0.0 and any
//! computed NaN/infinity is coerced to 0.0 before it can poison the
//! network weights downstream.

use serde::{Deserialize, Serialize};

use crate::patterns::PatternScan;
use crate::types::MarketObservation;

pub const NUM_FEATURES: usize = 15;

// Slot layout
pub const F_RSI: usize = 0;
pub const F_MACD: usize = 1;
pub const F_PRICE_VS_SMA20: usize = 2;
pub const F_SMA20_VS_SMA50: usize = 3;
pub const F_VOLUME_RATIO: usize = 4;
pub const F_VOLATILITY: usize = 5;
pub const F_MOMENTUM: usize = 6;
pub const F_NEWS_SENTIMENT: usize = 7;
pub const F_SOCIAL_SENTIMENT: usize = 8;
pub const F_PUT_CALL: usize = 9;
pub const F_OPTIONS_VOLUME: usize = 10;
pub const F_SECTOR_STRENGTH: usize = 11;
pub const F_MARKET_BREADTH: usize = 12;
pub const F_INDEX_CORRELATION: usize = 13;
pub const F_PATTERN_CONFIDENCE: usize = 14;

/// Fixed-length, always-finite feature vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(Vec<f64>);

impl Default for FeatureVector {
    fn default() -> Self {
        Self(vec![0.0; NUM_FEATURES])
    }
}

impl FeatureVector {
    /// Build from raw values, padding/truncating to length 15 and
    /// coercing every non-finite value to 0.0.
    pub fn from_raw(values: Vec<f64>) -> Self {
        let mut v: Vec<f64> = values
            .into_iter()
            .map(|x| if x.is_finite() { x } else { 0.0 })
            .collect();
        v.resize(NUM_FEATURES, 0.0);
        Self(v)
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn get(&self, idx: usize) -> f64 {
        self.0.get(idx).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, idx: usize, value: f64) {
        if idx < NUM_FEATURES {
            self.0[idx] = if value.is_finite() { value } else { 0.0 };
        }
    }

    /// Human-readable slot names, aligned with the slot constants.
    pub fn names() -> [&'static str; NUM_FEATURES] {
        [
            "rsi",
            "macd_histogram",
            "price_vs_sma20",
            "sma20_vs_sma50",
            "volume_ratio",
            "volatility",
            "momentum",
            "news_sentiment",
            "social_sentiment",
            "put_call_ratio",
            "options_volume",
            "sector_strength",
            "market_breadth",
            "index_correlation",
            "pattern_confidence",
        ]
    }
}

/// Extract the 15-slot feature vector from an observation plus the
/// pattern scan of its price history. Pure function; no side effects.
pub fn extract_features(obs: &MarketObservation, scan: &PatternScan) -> FeatureVector {
    let prices = &obs.price_history;
    let mut f = FeatureVector::default();

    // Technical (0-6)
    f.set(F_RSI, obs.rsi.map(|r| (r / 100.0).clamp(0.0, 1.0)).unwrap_or(0.0));
    f.set(F_MACD, obs.macd_histogram.map(|m| m.tanh()).unwrap_or(0.0));
    f.set(F_PRICE_VS_SMA20, price_vs_sma(prices, 20));
    f.set(F_SMA20_VS_SMA50, sma_ratio(prices, 20, 50));
    f.set(F_VOLUME_RATIO, volume_ratio(&obs.volume_history));
    f.set(F_VOLATILITY, return_volatility(prices, 20));
    f.set(F_MOMENTUM, momentum(prices, 10));

    // Sentiment (7-8)
    f.set(F_NEWS_SENTIMENT, obs.news_sentiment.unwrap_or(0.0).clamp(-1.0, 1.0));
    f.set(
        F_SOCIAL_SENTIMENT,
        obs.social_sentiment.unwrap_or(0.0).clamp(-1.0, 1.0),
    );

    // Options flow (9-10)
    // Put/call near 1.0 is neutral; map to [-1, 1] around that point
    f.set(
        F_PUT_CALL,
        obs.put_call_ratio.map(|r| (1.0 - r).clamp(-1.0, 1.0)).unwrap_or(0.0),
    );
    f.set(
        F_OPTIONS_VOLUME,
        obs.options_volume_ratio
            .map(|r| ((r - 1.0) / 2.0).clamp(-1.0, 1.0))
            .unwrap_or(0.0),
    );

    // Market structure (11-14)
    f.set(F_SECTOR_STRENGTH, obs.sector_strength.unwrap_or(0.0).clamp(-1.0, 1.0));
    f.set(F_MARKET_BREADTH, obs.market_breadth.unwrap_or(0.0).clamp(-1.0, 1.0));
    f.set(
        F_INDEX_CORRELATION,
        obs.index_correlation.unwrap_or(0.0).clamp(-1.0, 1.0),
    );
    f.set(F_PATTERN_CONFIDENCE, scan.max_confidence);

    f
}

/// Simple moving average over the trailing `period` points.
pub fn sma(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period {
        return None;
    }
    let window = &prices[prices.len() - period..];
    Some(window.iter().sum::<f64>() / period as f64)
}

fn price_vs_sma(prices: &[f64], period: usize) -> f64 {
    let last = match prices.last() {
        Some(p) if *p > 0.0 => *p,
        _ => return 0.0,
    };
    match sma(prices, period) {
        Some(avg) if avg > 0.0 => ((last - avg) / avg * 10.0).clamp(-1.0, 1.0),
        _ => 0.0,
    }
}

fn sma_ratio(prices: &[f64], fast: usize, slow: usize) -> f64 {
    match (sma(prices, fast), sma(prices, slow)) {
        (Some(f), Some(s)) if s > 0.0 => ((f - s) / s * 10.0).clamp(-1.0, 1.0),
        _ => 0.0,
    }
}

fn volume_ratio(volumes: &[f64]) -> f64 {
    if volumes.len() < 2 {
        return 0.0;
    }
    let last = volumes[volumes.len() - 1];
    let avg = volumes.iter().sum::<f64>() / volumes.len() as f64;
    if avg > 0.0 {
        // 1.0 average volume maps to 0.0; heavy volume saturates at 1.0
        ((last / avg - 1.0) / 2.0).clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Standard deviation of simple returns over the trailing window.
fn return_volatility(prices: &[f64], period: usize) -> f64 {
    if prices.len() < period + 1 {
        return 0.0;
    }
    let window = &prices[prices.len() - period - 1..];
    let returns: Vec<f64> = window
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect();
    if returns.is_empty() {
        return 0.0;
    }
    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / returns.len() as f64;
    let vol = (var.sqrt() * 10.0).clamp(0.0, 1.0);
    if vol.is_finite() {
        vol
    } else {
        0.0
    }
}

fn momentum(prices: &[f64], lookback: usize) -> f64 {
    if prices.len() <= lookback {
        return 0.0;
    }
    let past = prices[prices.len() - 1 - lookback];
    let last = prices[prices.len() - 1];
    if past > 0.0 {
        ((last - past) / past * 5.0).clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns;

    #[test]
    fn test_vector_always_15_finite() {
        let obs = MarketObservation::default();
        let scan = PatternScan::default();
        let f = extract_features(&obs, &scan);
        assert_eq!(f.values().len(), NUM_FEATURES);
        assert!(f.values().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_nan_inputs_coerced() {
        let obs = MarketObservation {
            symbol: "TEST".into(),
            price_history: vec![f64::NAN; 60],
            rsi: Some(f64::NAN),
            macd_histogram: Some(f64::INFINITY),
            ..Default::default()
        };
        let scan = patterns::detect_patterns(&obs.price_history);
        let f = extract_features(&obs, &scan);
        assert!(f.values().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_from_raw_pads_and_sanitizes() {
        let f = FeatureVector::from_raw(vec![1.0, f64::NAN, f64::NEG_INFINITY]);
        assert_eq!(f.values().len(), NUM_FEATURES);
        assert_eq!(f.get(0), 1.0);
        assert_eq!(f.get(1), 0.0);
        assert_eq!(f.get(2), 0.0);
        assert_eq!(f.get(14), 0.0);
    }

    #[test]
    fn test_uptrend_features_positive() {
        let prices: Vec<f64> = (1..=60).map(|i| 100.0 + i as f64).collect();
        let obs = MarketObservation {
            symbol: "UP".into(),
            price_history: prices,
            rsi: Some(65.0),
            ..Default::default()
        };
        let scan = PatternScan::default();
        let f = extract_features(&obs, &scan);
        assert!(f.get(F_PRICE_VS_SMA20) > 0.0);
        assert!(f.get(F_SMA20_VS_SMA50) > 0.0);
        assert!(f.get(F_MOMENTUM) > 0.0);
    }

    #[test]
    fn test_slot_names_align() {
        let names = FeatureVector::names();
        assert_eq!(names.len(), NUM_FEATURES);
        assert_eq!(names[F_RSI], "rsi");
        assert_eq!(names[F_PATTERN_CONFIDENCE], "pattern_confidence");
    }
}
