//! Pattern Recognizer - named chart patterns from price history
//!
//! Evaluates a fixed catalogue against a price series and reports each
//! match with a nominal confidence and a directional bias. Detection is
//! purely arithmetic over the series: identical history always yields
//! an identical scan.
//!
//! Histories shorter than 50 points short-circuit to an empty scan;
//! the moving-average crossovers additionally need 200 points.

use serde::{Deserialize, Serialize};

use crate::features::sma;
use crate::types::Direction;

/// Minimum history length before any pattern is evaluated.
pub const MIN_HISTORY: usize = 50;
/// History needed for the 50/200 SMA crossover patterns.
pub const CROSSOVER_HISTORY: usize = 200;

/// Catalogue of recognized chart patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternKind {
    GoldenCross,
    DeathCross,
    BullFlag,
    BearFlag,
    CupAndHandle,
    HeadAndShoulders,
    AscendingTriangle,
    DescendingTriangle,
    Range,
}

impl PatternKind {
    /// Stable name used as the key in the persisted pattern table.
    pub fn as_key(&self) -> &'static str {
        match self {
            PatternKind::GoldenCross => "golden_cross",
            PatternKind::DeathCross => "death_cross",
            PatternKind::BullFlag => "bull_flag",
            PatternKind::BearFlag => "bear_flag",
            PatternKind::CupAndHandle => "cup_and_handle",
            PatternKind::HeadAndShoulders => "head_and_shoulders",
            PatternKind::AscendingTriangle => "ascending_triangle",
            PatternKind::DescendingTriangle => "descending_triangle",
            PatternKind::Range => "range",
        }
    }

    /// Nominal confidence assigned on detection, before any
    /// historical-success adjustment.
    pub fn nominal_confidence(&self) -> f64 {
        match self {
            PatternKind::GoldenCross | PatternKind::DeathCross => 0.80,
            PatternKind::BullFlag | PatternKind::BearFlag => 0.70,
            PatternKind::CupAndHandle | PatternKind::HeadAndShoulders => 0.65,
            PatternKind::AscendingTriangle | PatternKind::DescendingTriangle => 0.60,
            PatternKind::Range => 0.50,
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            PatternKind::GoldenCross
            | PatternKind::BullFlag
            | PatternKind::CupAndHandle
            | PatternKind::AscendingTriangle => Direction::Bullish,
            PatternKind::DeathCross
            | PatternKind::BearFlag
            | PatternKind::HeadAndShoulders
            | PatternKind::DescendingTriangle => Direction::Bearish,
            PatternKind::Range => Direction::Neutral,
        }
    }
}

/// One detected pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternMatch {
    pub kind: PatternKind,
    pub confidence: f64,
    pub direction: Direction,
}

/// Result of scanning a price history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternScan {
    pub matches: Vec<PatternMatch>,
    /// Maximum confidence among matches; 0.5 when nothing matched
    /// (or the history was too short to evaluate).
    pub max_confidence: f64,
}

impl Default for PatternScan {
    fn default() -> Self {
        Self {
            matches: Vec::new(),
            max_confidence: 0.5,
        }
    }
}

impl PatternScan {
    pub fn contains(&self, kind: PatternKind) -> bool {
        self.matches.iter().any(|m| m.kind == kind)
    }
}

/// Scan a price history (oldest first) for the full catalogue.
pub fn detect_patterns(prices: &[f64]) -> PatternScan {
    if prices.len() < MIN_HISTORY || prices.iter().any(|p| !p.is_finite()) {
        return PatternScan::default();
    }

    let mut matches = Vec::new();

    if prices.len() >= CROSSOVER_HISTORY {
        if let Some(kind) = detect_crossover(prices) {
            push(&mut matches, kind);
        }
    }
    if let Some(kind) = detect_flag(prices) {
        push(&mut matches, kind);
    }
    if detect_cup_and_handle(prices) {
        push(&mut matches, PatternKind::CupAndHandle);
    }
    if detect_head_and_shoulders(prices) {
        push(&mut matches, PatternKind::HeadAndShoulders);
    }
    if let Some(kind) = detect_triangle(prices) {
        push(&mut matches, kind);
    }

    let max_confidence = matches
        .iter()
        .map(|m| m.confidence)
        .fold(f64::NEG_INFINITY, f64::max);
    PatternScan {
        max_confidence: if matches.is_empty() { 0.5 } else { max_confidence },
        matches,
    }
}

fn push(matches: &mut Vec<PatternMatch>, kind: PatternKind) {
    matches.push(PatternMatch {
        kind,
        confidence: kind.nominal_confidence(),
        direction: kind.direction(),
    });
}

/// Golden/death cross: 50-SMA crossing the 200-SMA within the last
/// few bars.
fn detect_crossover(prices: &[f64]) -> Option<PatternKind> {
    const LOOKBACK: usize = 5;
    if prices.len() < CROSSOVER_HISTORY + LOOKBACK {
        return None;
    }
    let prev = &prices[..prices.len() - LOOKBACK];
    let fast_now = sma(prices, 50)?;
    let slow_now = sma(prices, 200)?;
    let fast_prev = sma(prev, 50)?;
    let slow_prev = sma(prev, 200)?;

    if fast_prev <= slow_prev && fast_now > slow_now {
        Some(PatternKind::GoldenCross)
    } else if fast_prev >= slow_prev && fast_now < slow_now {
        Some(PatternKind::DeathCross)
    } else {
        None
    }
}

/// Flags: a strong directional leg followed by a tight, low-volatility
/// consolidation over the last ~10 bars.
fn detect_flag(prices: &[f64]) -> Option<PatternKind> {
    const CONSOLIDATION: usize = 10;
    let split = prices.len() - CONSOLIDATION;
    let leg = &prices[..split];
    let tail = &prices[split..];

    let leg_start = *leg.first()?;
    let leg_end = *leg.last()?;
    if leg_start <= 0.0 {
        return None;
    }
    let leg_return = (leg_end - leg_start) / leg_start;

    let tail_vol = normalized_range(tail);
    let tail_slope = slope(tail);
    // Consolidation: tight range, near-flat drift
    if tail_vol > 0.03 || tail_slope.abs() > 0.002 {
        return None;
    }

    if leg_return > 0.08 {
        Some(PatternKind::BullFlag)
    } else if leg_return < -0.08 {
        Some(PatternKind::BearFlag)
    } else {
        None
    }
}

/// Cup-and-handle: left rim high, rounded low in the middle, recovery
/// back near the rim with a shallow handle dip at the end.
fn detect_cup_and_handle(prices: &[f64]) -> bool {
    let n = prices.len();
    let third = n / 3;
    let left_high = max_of(&prices[..third]);
    let middle_low = min_of(&prices[third..2 * third]);
    let right_high = max_of(&prices[2 * third..]);
    let last = prices[n - 1];

    if left_high <= 0.0 {
        return false;
    }
    let cup_depth = (left_high - middle_low) / left_high;
    let rim_gap = (left_high - right_high).abs() / left_high;
    let handle_dip = (right_high - last) / left_high;

    cup_depth > 0.10 && cup_depth < 0.50 && rim_gap < 0.05 && handle_dip > 0.0 && handle_dip < 0.10
}

/// Head-and-shoulders: middle-third peak above comparable side peaks.
fn detect_head_and_shoulders(prices: &[f64]) -> bool {
    let n = prices.len();
    let third = n / 3;
    let left = max_of(&prices[..third]);
    let head = max_of(&prices[third..2 * third]);
    let right = max_of(&prices[2 * third..]);

    if left <= 0.0 || right <= 0.0 {
        return false;
    }
    let shoulders_even = (left - right).abs() / left < 0.04;
    let head_above = head > left * 1.05 && head > right * 1.05;
    // Right shoulder rolling over confirms the bearish read
    let rolling_over = prices[n - 1] < right * 0.98;

    shoulders_even && head_above && rolling_over
}

/// Triangles/range via trend convergence of segment extrema over the
/// last 30 bars.
fn detect_triangle(prices: &[f64]) -> Option<PatternKind> {
    const SEGMENT: usize = 6;
    let tail = &prices[prices.len() - 30..];
    let highs: Vec<f64> = tail.chunks(SEGMENT).map(max_of).collect();
    let lows: Vec<f64> = tail.chunks(SEGMENT).map(min_of).collect();

    let mid = tail.iter().sum::<f64>() / tail.len() as f64;
    if mid <= 0.0 {
        return None;
    }
    // Normalize slopes to fraction-of-price per segment
    let high_slope = slope(&highs) / mid;
    let low_slope = slope(&lows) / mid;

    const FLAT: f64 = 0.002;
    const TREND: f64 = 0.004;

    if high_slope.abs() < FLAT && low_slope > TREND {
        Some(PatternKind::AscendingTriangle)
    } else if low_slope.abs() < FLAT && high_slope < -TREND {
        Some(PatternKind::DescendingTriangle)
    } else if high_slope.abs() < FLAT && low_slope.abs() < FLAT {
        Some(PatternKind::Range)
    } else {
        None
    }
}

/// Least-squares slope per step.
fn slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let n_f = n as f64;
    let mean_x = (n_f - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n_f;
    let mut num = 0.0;
    let mut den = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        num += dx * (y - mean_y);
        den += dx * dx;
    }
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

/// High-low range of a window relative to its mean.
fn normalized_range(values: &[f64]) -> f64 {
    let hi = max_of(values);
    let lo = min_of(values);
    let mid = values.iter().sum::<f64>() / values.len().max(1) as f64;
    if mid > 0.0 {
        (hi - lo) / mid
    } else {
        0.0
    }
}

fn max_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

fn min_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}
