use serde::Serialize;

use common::{PriceBar, PriceSeries};

use crate::config::StructureConfig;

/// Where the latest close sits inside the recent trading range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketStructure {
    /// Close within reach of the range high: possible breakout.
    TestingHighs,
    /// Close within reach of the range low: possible breakdown.
    TestingLows,
    Ranging,
    /// Not enough history to judge.
    Undefined,
}

impl std::fmt::Display for MarketStructure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarketStructure::TestingHighs => write!(f, "Testing highs (possible breakout)"),
            MarketStructure::TestingLows => write!(f, "Testing lows (possible breakdown)"),
            MarketStructure::Ranging => write!(f, "Ranging / consolidation"),
            MarketStructure::Undefined => write!(f, "Undefined"),
        }
    }
}

pub fn detect_structure(series: &PriceSeries) -> MarketStructure {
    detect_structure_with(series, &StructureConfig::default())
}

/// Compare the latest close with the trailing range. Highs are checked first.
pub fn detect_structure_with(series: &PriceSeries, cfg: &StructureConfig) -> MarketStructure {
    let Some(last) = series.last() else {
        return MarketStructure::Undefined;
    };
    if series.len() < cfg.window * 4 {
        return MarketStructure::Undefined;
    }

    let recent = series.tail(cfg.lookback);
    let range_high = recent.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    let range_low = recent.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);

    if last.close >= range_high * (1.0 - cfg.proximity) {
        MarketStructure::TestingHighs
    } else if last.close <= range_low * (1.0 + cfg.proximity) {
        MarketStructure::TestingLows
    } else {
        MarketStructure::Ranging
    }
}

/// Single- and two-candle reversal patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CandlePattern {
    /// Hammer: long lower wick rejecting lower prices.
    BullishPinBar,
    /// Shooting star: long upper wick rejecting higher prices.
    BearishPinBar,
    BullishEngulfing,
    BearishEngulfing,
}

impl std::fmt::Display for CandlePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CandlePattern::BullishPinBar => write!(f, "Bullish pin bar (hammer)"),
            CandlePattern::BearishPinBar => write!(f, "Bearish pin bar (shooting star)"),
            CandlePattern::BullishEngulfing => write!(f, "Bullish engulfing"),
            CandlePattern::BearishEngulfing => write!(f, "Bearish engulfing"),
        }
    }
}

/// Patterns formed by the latest bar (against the bar before it).
/// Fewer than two bars → no patterns.
pub fn detect_patterns(series: &PriceSeries) -> Vec<CandlePattern> {
    let [.., prev, curr] = series.bars() else {
        return Vec::new();
    };

    let mut patterns = Vec::new();
    if let Some(pin) = pin_bar(curr) {
        patterns.push(pin);
    }
    if let Some(engulfing) = engulfing(prev, curr) {
        patterns.push(engulfing);
    }
    patterns
}

fn pin_bar(bar: &PriceBar) -> Option<CandlePattern> {
    if bar.range() <= 0.0 {
        return None;
    }
    let body = bar.body();
    let (upper, lower) = (bar.upper_wick(), bar.lower_wick());
    if lower > body * 2.0 && upper < body {
        Some(CandlePattern::BullishPinBar)
    } else if upper > body * 2.0 && lower < body {
        Some(CandlePattern::BearishPinBar)
    } else {
        None
    }
}

fn engulfing(prev: &PriceBar, curr: &PriceBar) -> Option<CandlePattern> {
    if prev.is_bearish() && curr.is_bullish() && curr.close > prev.open && curr.open < prev.close {
        Some(CandlePattern::BullishEngulfing)
    } else if prev.is_bullish()
        && curr.is_bearish()
        && curr.close < prev.open
        && curr.open > prev.close
    {
        Some(CandlePattern::BearishEngulfing)
    } else {
        None
    }
}
