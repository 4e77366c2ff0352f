use chrono::{DateTime, Utc};
use serde::Serialize;

use common::{NewsSentiment, PriceSeries, TimeframeSet};
use strategy::indicators::analyze_volume_with;
use strategy::{
    classify_trend, compute_indicators_with, confluence_with, correlation_check_with,
    detect_patterns, fibonacci_levels_with, historical_levels_with, synthesize_signal_with,
    AnalysisConfig, CandlePattern, ConfluenceResult, CorrelationResult, FibonacciLevels,
    LevelSplit, SignalOpinion, TrendReading, VolumeRegime,
};

/// Historical levels shown on each side of the price.
const HISTORICAL_LEVELS_SHOWN: usize = 3;

/// Gap between price and the nearest Fibonacci level worth calling out.
const KEY_LEVEL_BUFFER: f64 = 0.001;

/// Nearest Fibonacci support and resistance outside the buffer around price.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct KeyLevels {
    pub support: Option<f64>,
    pub resistance: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceReading {
    pub ticker: String,
    pub last: Option<f64>,
    pub correlation: CorrelationResult,
}

/// Everything the dashboard shows after one refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub symbol: String,
    pub generated_at: DateTime<Utc>,
    /// Latest close of the primary timeframe; `None` when it had no data.
    pub price: Option<f64>,
    pub change_pct: f64,
    pub trend: TrendReading,
    pub signal: SignalOpinion,
    /// `None` when the primary timeframe had no data.
    pub confluence: Option<ConfluenceResult>,
    pub fibonacci: Option<FibonacciLevels>,
    pub key_levels: KeyLevels,
    pub historical: LevelSplit,
    pub volume: VolumeRegime,
    pub patterns: Vec<CandlePattern>,
    pub reference: ReferenceReading,
    /// Headline mood, independent of the signal.
    pub news: NewsSentiment,
}

impl DashboardSnapshot {
    pub fn is_degenerate(&self) -> bool {
        self.price.is_none()
    }
}

/// Inputs of one refresh, already fetched. Failed fetches are empty series.
pub struct SnapshotInputs<'a> {
    pub symbol: &'a str,
    pub timeframes: TimeframeSet,
    pub history: &'a PriceSeries,
    pub reference_ticker: &'a str,
    pub reference: &'a PriceSeries,
    pub news: NewsSentiment,
}

/// Compose the dashboard from raw fetched series. Indicators are computed
/// here, per timeframe; nothing is fetched or mutated.
pub fn build_snapshot(
    inputs: SnapshotInputs<'_>,
    primary: common::Timeframe,
    cfg: &AnalysisConfig,
    generated_at: DateTime<Utc>,
) -> DashboardSnapshot {
    let timeframes: TimeframeSet = inputs
        .timeframes
        .iter()
        .map(|(tf, series)| (*tf, compute_indicators_with(series, &cfg.indicators)))
        .collect();
    let reference_last = inputs.reference.last().map(|b| b.close);

    let Some(h1) = timeframes.get(&primary).filter(|s| !s.is_empty()) else {
        return DashboardSnapshot {
            symbol: inputs.symbol.to_string(),
            generated_at,
            price: None,
            change_pct: 0.0,
            trend: TrendReading::insufficient(),
            signal: SignalOpinion::insufficient_data(),
            confluence: None,
            fibonacci: None,
            key_levels: KeyLevels::default(),
            historical: LevelSplit::default(),
            volume: VolumeRegime::NotAvailable,
            patterns: Vec::new(),
            reference: ReferenceReading {
                ticker: inputs.reference_ticker.to_string(),
                last: reference_last,
                correlation: CorrelationResult::not_available(),
            },
            news: inputs.news,
        };
    };

    let closes = h1.closes();
    let price = closes[closes.len() - 1];
    let change_pct = match closes.len().checked_sub(2).map(|i| closes[i]) {
        Some(prev) if prev != 0.0 => (price - prev) / prev * 100.0,
        _ => 0.0,
    };

    let fibonacci = fibonacci_levels_with(h1, &cfg.levels);
    let signal = synthesize_signal_with(&timeframes, cfg);
    let correlation =
        correlation_check_with(inputs.reference, signal.label.as_str(), &cfg.correlation);
    let historical = LevelSplit::around(&historical_levels_with(inputs.history, &cfg.levels), price)
        .nearest(HISTORICAL_LEVELS_SHOWN);

    DashboardSnapshot {
        symbol: inputs.symbol.to_string(),
        generated_at,
        price: Some(price),
        change_pct,
        trend: classify_trend(h1),
        confluence: Some(confluence_with(&timeframes, &cfg.confluence)),
        key_levels: key_levels(fibonacci.as_ref(), price),
        fibonacci,
        historical,
        volume: analyze_volume_with(h1, &cfg.volume),
        patterns: detect_patterns(h1),
        reference: ReferenceReading {
            ticker: inputs.reference_ticker.to_string(),
            last: reference_last,
            correlation,
        },
        news: inputs.news,
        signal,
    }
}

fn key_levels(fibonacci: Option<&FibonacciLevels>, price: f64) -> KeyLevels {
    let Some(fib) = fibonacci else {
        return KeyLevels::default();
    };
    let prices = fib.prices();
    KeyLevels {
        support: prices
            .iter()
            .copied()
            .filter(|&p| p < price * (1.0 - KEY_LEVEL_BUFFER))
            .max_by(f64::total_cmp),
        resistance: prices
            .iter()
            .copied()
            .filter(|&p| p > price * (1.0 + KEY_LEVEL_BUFFER))
            .min_by(f64::total_cmp),
    }
}
