use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use common::{Indicator, PriceSeries, Timeframe, TimeframeSet};

use crate::config::ConfluenceConfig;
use crate::indicators::{with_trend_emas, RsiIndicator, EMA_SLOW_PERIOD};

/// Traffic-light trend state of one timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendStatus {
    Bullish,
    Bearish,
    Neutral,
    /// No data for the timeframe.
    #[serde(rename = "N/A")]
    NotAvailable,
}

impl std::fmt::Display for TrendStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrendStatus::Bullish => write!(f, "BULLISH"),
            TrendStatus::Bearish => write!(f, "BEARISH"),
            TrendStatus::Neutral => write!(f, "NEUTRAL"),
            TrendStatus::NotAvailable => write!(f, "N/A"),
        }
    }
}

/// Trend plus the latest RSI, as shown on the headline metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendReading {
    pub status: TrendStatus,
    pub rsi: f64,
}

impl TrendReading {
    /// Sentinel for series shorter than the EMA 200 lookback.
    pub fn insufficient() -> Self {
        Self { status: TrendStatus::NotAvailable, rsi: 0.0 }
    }

    pub fn is_insufficient(&self) -> bool {
        self.status == TrendStatus::NotAvailable
    }
}

/// Classify a series that has at least 200 bars; shorter series get the
/// insufficient-data sentinel (rsi 0). Missing EMA or RSI columns are
/// computed from the bars.
pub fn classify_trend(series: &PriceSeries) -> TrendReading {
    if series.len() < EMA_SLOW_PERIOD {
        debug!(
            bars = series.len(),
            timeframe = %series.timeframe(),
            "Not enough bars to classify trend"
        );
        return TrendReading::insufficient();
    }

    let rsi = series
        .latest(Indicator::Rsi)
        .or_else(|| RsiIndicator::new(14).compute(&series.closes()))
        .unwrap_or(0.0);

    TrendReading { status: trend_status(series), rsi }
}

/// Close against EMA 50 and EMA 200: above both is bullish, below both
/// bearish, anything else neutral. An empty series is `NotAvailable`.
///
/// EMA columns are computed on demand when the indicator step was skipped.
/// While the EMAs are still undefined the close compares as neither above
/// nor below, which yields `Neutral`.
pub fn trend_status(series: &PriceSeries) -> TrendStatus {
    let Some(last) = series.last() else {
        return TrendStatus::NotAvailable;
    };

    let series: Cow<'_, PriceSeries> =
        if series.has_indicator(Indicator::Ema50) && series.has_indicator(Indicator::Ema200) {
            Cow::Borrowed(series)
        } else {
            debug!(timeframe = %series.timeframe(), "EMA columns missing, computing on demand");
            Cow::Owned(with_trend_emas(series))
        };

    let ema50 = last_value(&series, Indicator::Ema50);
    let ema200 = last_value(&series, Indicator::Ema200);

    if last.close > ema50 && last.close > ema200 {
        TrendStatus::Bullish
    } else if last.close < ema50 && last.close < ema200 {
        TrendStatus::Bearish
    } else {
        TrendStatus::Neutral
    }
}

fn last_value(series: &PriceSeries, indicator: Indicator) -> f64 {
    series
        .indicator(indicator)
        .and_then(|v| v.last().copied())
        .unwrap_or(f64::NAN)
}

/// Aggregate agreement across timeframes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfluenceLabel {
    FullBullish,
    StrongBullish,
    FullBearish,
    StrongBearish,
    Mixed,
}

impl std::fmt::Display for ConfluenceLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfluenceLabel::FullBullish => write!(f, "FULL BULLISH (total confluence)"),
            ConfluenceLabel::StrongBullish => write!(f, "Strong bullish"),
            ConfluenceLabel::FullBearish => write!(f, "FULL BEARISH (total confluence)"),
            ConfluenceLabel::StrongBearish => write!(f, "Strong bearish"),
            ConfluenceLabel::Mixed => write!(f, "Mixed / uncertain"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfluenceResult {
    pub statuses: BTreeMap<Timeframe, TrendStatus>,
    pub label: ConfluenceLabel,
}

impl ConfluenceResult {
    /// Timeframes that had data.
    pub fn valid_count(&self) -> usize {
        self.statuses
            .values()
            .filter(|s| **s != TrendStatus::NotAvailable)
            .count()
    }
}

pub fn confluence(timeframes: &TimeframeSet) -> ConfluenceResult {
    confluence_with(timeframes, &ConfluenceConfig::default())
}

/// Classify every timeframe and reduce to one label. Timeframes without
/// data are reported as `NotAvailable` and left out of the vote; with no
/// valid timeframe at all the label is `Mixed`.
pub fn confluence_with(timeframes: &TimeframeSet, cfg: &ConfluenceConfig) -> ConfluenceResult {
    let statuses: BTreeMap<Timeframe, TrendStatus> = timeframes
        .iter()
        .map(|(tf, series)| (*tf, trend_status(series)))
        .collect();

    let valid = statuses.values().filter(|s| **s != TrendStatus::NotAvailable).count();
    let bullish = statuses.values().filter(|s| **s == TrendStatus::Bullish).count();
    let bearish = statuses.values().filter(|s| **s == TrendStatus::Bearish).count();
    let strong = valid as f64 * cfg.strong_ratio;

    let label = if valid == 0 {
        ConfluenceLabel::Mixed
    } else if bullish == valid {
        ConfluenceLabel::FullBullish
    } else if bearish == valid {
        ConfluenceLabel::FullBearish
    } else if bullish as f64 >= strong {
        ConfluenceLabel::StrongBullish
    } else if bearish as f64 >= strong {
        ConfluenceLabel::StrongBearish
    } else {
        ConfluenceLabel::Mixed
    };

    ConfluenceResult { statuses, label }
}
