use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// One OHLCV candle. Immutable once fetched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    pub fn upper_wick(&self) -> f64 {
        self.high - self.close.max(self.open)
    }

    pub fn lower_wick(&self) -> f64 {
        self.close.min(self.open) - self.low
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

/// Candle period of a series.
///
/// Ordered by duration so a `BTreeMap<Timeframe, _>` iterates from the
/// fastest to the slowest timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
    #[serde(rename = "1w")]
    W1,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
            Timeframe::W1 => "1w",
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1m" => Ok(Timeframe::M1),
            "5m" => Ok(Timeframe::M5),
            "15m" => Ok(Timeframe::M15),
            "30m" => Ok(Timeframe::M30),
            "1h" => Ok(Timeframe::H1),
            "4h" => Ok(Timeframe::H4),
            "1d" | "1D" => Ok(Timeframe::D1),
            "1w" | "1W" => Ok(Timeframe::W1),
            other => Err(Error::Config(format!("unknown timeframe '{other}'"))),
        }
    }
}

/// Indicator columns that can be attached to a `PriceSeries`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Indicator {
    Rsi,
    Macd,
    MacdSignal,
    MacdHistogram,
    BollingerUpper,
    BollingerMiddle,
    BollingerLower,
    #[serde(rename = "EMA_50")]
    Ema50,
    #[serde(rename = "EMA_200")]
    Ema200,
    #[serde(rename = "VOL_SMA_20")]
    VolumeSma20,
}

impl std::fmt::Display for Indicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Indicator::Rsi => "RSI",
            Indicator::Macd => "MACD",
            Indicator::MacdSignal => "MACD_SIGNAL",
            Indicator::MacdHistogram => "MACD_HISTOGRAM",
            Indicator::BollingerUpper => "BOLLINGER_UPPER",
            Indicator::BollingerMiddle => "BOLLINGER_MIDDLE",
            Indicator::BollingerLower => "BOLLINGER_LOWER",
            Indicator::Ema50 => "EMA_50",
            Indicator::Ema200 => "EMA_200",
            Indicator::VolumeSma20 => "VOL_SMA_20",
        };
        f.write_str(name)
    }
}

/// One series per timeframe, iterated fastest to slowest.
pub type TimeframeSet = BTreeMap<Timeframe, PriceSeries>;

/// Ordered candles for one (symbol, timeframe) pair plus any indicator
/// columns computed over them.
///
/// Indicator columns are index-aligned with `bars`; leading entries are
/// `NaN` until the indicator's lookback is satisfied. A series is never
/// mutated in place: attaching a column returns a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    symbol: String,
    timeframe: Timeframe,
    bars: Vec<PriceBar>,
    #[serde(default)]
    indicators: BTreeMap<Indicator, Vec<f64>>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe, bars: Vec<PriceBar>) -> Self {
        debug_assert!(
            bars.windows(2).all(|w| w[0].timestamp < w[1].timestamp),
            "bars must be strictly increasing in time"
        );
        Self {
            symbol: symbol.into(),
            timeframe,
            bars,
            indicators: BTreeMap::new(),
        }
    }

    /// The "insufficient data" series a failed fetch degrades to.
    pub fn empty(symbol: impl Into<String>, timeframe: Timeframe) -> Self {
        Self::new(symbol, timeframe, Vec::new())
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    /// The most recent `n` bars (fewer if the series is shorter).
    pub fn tail(&self, n: usize) -> &[PriceBar] {
        &self.bars[self.bars.len().saturating_sub(n)..]
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    pub fn has_indicator(&self, indicator: Indicator) -> bool {
        self.indicators.contains_key(&indicator)
    }

    pub fn indicator(&self, indicator: Indicator) -> Option<&[f64]> {
        self.indicators.get(&indicator).map(Vec::as_slice)
    }

    /// Latest value of an indicator column, `None` if the column is absent
    /// or its last entry is still undefined.
    pub fn latest(&self, indicator: Indicator) -> Option<f64> {
        self.indicator(indicator)
            .and_then(|values| values.last().copied())
            .filter(|v| !v.is_nan())
    }

    pub fn indicators(&self) -> impl Iterator<Item = (Indicator, &[f64])> {
        self.indicators.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    /// Returns a new series with `values` attached as `indicator`,
    /// replacing any previous column of the same name.
    pub fn with_indicator(mut self, indicator: Indicator, values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), self.bars.len(), "{indicator} misaligned with bars");
        self.indicators.insert(indicator, values);
        self
    }

    /// The same candles with every indicator column dropped.
    pub fn without_indicators(&self) -> Self {
        Self::new(self.symbol.clone(), self.timeframe, self.bars.clone())
    }
}
