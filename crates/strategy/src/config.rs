use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use common::{Error, Result, Timeframe};

/// Analysis thresholds file (TOML). Every section and field is optional;
/// the defaults are the reference heuristics.
///
/// Example `config/analysis.toml`:
/// ```toml
/// [levels]
/// fibonacci_lookback = 100
/// pivot_window = 20
/// pivot_tolerance = 0.02
///
/// [signal]
/// long_overbought_veto = 70.0
/// short_oversold_veto = 30.0
///
/// [[timeframes.secondary]]
/// timeframe = "4h"
/// limit = 400
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub indicators: IndicatorConfig,
    pub levels: LevelConfig,
    pub structure: StructureConfig,
    pub confluence: ConfluenceConfig,
    pub signal: SignalConfig,
    pub correlation: CorrelationConfig,
    pub volume: VolumeConfig,
    pub timeframes: TimeframeConfig,
}

/// Lookback periods for the indicator engine. EMA 50 / EMA 200 are part of
/// the trend rules themselves and are not configurable.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bollinger_period: usize,
    pub bollinger_std: f64,
    pub volume_sma_period: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bollinger_period: 20,
            bollinger_std: 2.0,
            volume_sma_period: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LevelConfig {
    /// Bars of high/low history the Fibonacci retracement spans.
    pub fibonacci_lookback: usize,
    /// Width of the centred window a pivot must dominate.
    pub pivot_window: usize,
    /// Max fractional gap between neighbouring pivots in one cluster.
    pub pivot_tolerance: f64,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            fibonacci_lookback: 100,
            pivot_window: 20,
            pivot_tolerance: 0.02,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StructureConfig {
    /// Minimum history is `window * 4` bars.
    pub window: usize,
    /// Trailing bars scanned for the range high/low.
    pub lookback: usize,
    /// Fractional distance from the range edge that counts as a test.
    pub proximity: f64,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            window: 5,
            lookback: 50,
            proximity: 0.02,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConfluenceConfig {
    /// Share of valid timeframes that must agree for a "strong" label.
    pub strong_ratio: f64,
}

impl Default for ConfluenceConfig {
    fn default() -> Self {
        Self { strong_ratio: 0.75 }
    }
}

/// RSI gates and level offsets used by the signal synthesizer.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SignalConfig {
    pub long_overbought_veto: f64,
    pub long_oversold_opportunity: f64,
    pub short_oversold_veto: f64,
    pub short_overbought_opportunity: f64,
    /// Offset of the first fabricated support/resistance from price.
    pub near_fallback_pct: f64,
    /// Offset of the second fabricated support/resistance from price.
    pub far_fallback_pct: f64,
    /// Distance of the invalidation level beyond the 1h EMA 200.
    pub invalidation_buffer: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            long_overbought_veto: 70.0,
            long_oversold_opportunity: 35.0,
            short_oversold_veto: 30.0,
            short_overbought_opportunity: 65.0,
            near_fallback_pct: 0.02,
            far_fallback_pct: 0.04,
            invalidation_buffer: 0.01,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CorrelationConfig {
    pub sma_period: usize,
    /// Half-width of the neutral band around the SMA (0.002 = 0.2%).
    pub neutral_band: f64,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            sma_period: 20,
            neutral_band: 0.002,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct VolumeConfig {
    pub high_ratio: f64,
    pub low_ratio: f64,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            high_ratio: 1.5,
            low_ratio: 0.5,
        }
    }
}

/// One fetch request: which candles and how many.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct TimeframeFetch {
    pub timeframe: Timeframe,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeframeConfig {
    /// The execution timeframe the dashboard centres on.
    pub primary: TimeframeFetch,
    /// Additional timeframes for the signal and the confluence dashboard.
    pub secondary: Vec<TimeframeFetch>,
    /// Long history used for the clustered pivot levels.
    pub history: TimeframeFetch,
}

impl Default for TimeframeConfig {
    fn default() -> Self {
        Self {
            primary: TimeframeFetch { timeframe: Timeframe::H1, limit: 500 },
            secondary: vec![
                TimeframeFetch { timeframe: Timeframe::M15, limit: 400 },
                TimeframeFetch { timeframe: Timeframe::H4, limit: 400 },
                TimeframeFetch { timeframe: Timeframe::D1, limit: 400 },
            ],
            history: TimeframeFetch { timeframe: Timeframe::D1, limit: 400 },
        }
    }
}

impl AnalysisConfig {
    /// Load from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let cfg: Self = toml::from_str(&content).map_err(|e| {
            Error::Config(format!("failed to parse analysis config at '{}': {e}", path.display()))
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from `path` when it exists, otherwise fall back to the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            info!(path = %path.display(), "No analysis config file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        let ind = &self.indicators;
        if ind.rsi_period < 2 {
            return Err(Error::Config("indicators.rsi_period must be >= 2".into()));
        }
        if ind.macd_fast == 0 || ind.macd_fast >= ind.macd_slow || ind.macd_signal == 0 {
            return Err(Error::Config(
                "indicators.macd_fast must be > 0 and less than macd_slow; macd_signal must be > 0"
                    .into(),
            ));
        }
        if ind.bollinger_period == 0 || ind.volume_sma_period == 0 {
            return Err(Error::Config("indicator periods must be > 0".into()));
        }
        if self.levels.fibonacci_lookback == 0 || self.levels.pivot_window == 0 {
            return Err(Error::Config("levels windows must be > 0".into()));
        }
        if self.levels.pivot_tolerance < 0.0 {
            return Err(Error::Config("levels.pivot_tolerance must be >= 0".into()));
        }
        if self.structure.window == 0 || self.structure.lookback == 0 {
            return Err(Error::Config("structure windows must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.confluence.strong_ratio) {
            return Err(Error::Config("confluence.strong_ratio must be within 0..=1".into()));
        }
        let sig = &self.signal;
        if !(0.0 < sig.near_fallback_pct && sig.near_fallback_pct < 1.0)
            || !(0.0 < sig.far_fallback_pct && sig.far_fallback_pct < 1.0)
        {
            return Err(Error::Config("signal fallback offsets must be within (0, 1)".into()));
        }
        if self.correlation.sma_period == 0 {
            return Err(Error::Config("correlation.sma_period must be > 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_reference_defaults() {
        let cfg: AnalysisConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, AnalysisConfig::default());
        assert_eq!(cfg.levels.pivot_window, 20);
        assert_eq!(cfg.signal.long_overbought_veto, 70.0);
        assert_eq!(cfg.timeframes.primary.limit, 500);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg: AnalysisConfig = toml::from_str(
            r#"
            [levels]
            pivot_tolerance = 0.05

            [[timeframes.secondary]]
            timeframe = "4h"
            limit = 250
            "#,
        )
        .unwrap();
        assert_eq!(cfg.levels.pivot_tolerance, 0.05);
        assert_eq!(cfg.levels.pivot_window, 20);
        assert_eq!(cfg.timeframes.secondary.len(), 1);
        assert_eq!(cfg.timeframes.secondary[0].timeframe, Timeframe::H4);
    }

    #[test]
    fn validate_rejects_inverted_macd() {
        let mut cfg = AnalysisConfig::default();
        cfg.indicators.macd_fast = 30;
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = AnalysisConfig::load_or_default("does/not/exist.toml").unwrap();
        assert_eq!(cfg, AnalysisConfig::default());
    }
}
