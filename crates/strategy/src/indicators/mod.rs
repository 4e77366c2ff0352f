pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod volume;

pub use bollinger::{BollingerBands, BollingerSeries};
pub use ema::EmaIndicator;
pub use macd::{MacdIndicator, MacdPoint, MacdSeries};
pub use rsi::RsiIndicator;
pub use volume::{analyze_volume, analyze_volume_with, VolumeRegime};

use common::{Indicator, PriceSeries};

use crate::config::IndicatorConfig;

pub const EMA_FAST_PERIOD: usize = 50;
pub const EMA_SLOW_PERIOD: usize = 200;

/// Attach every indicator column to `series` using the default periods.
///
/// An empty series is returned unchanged. Existing columns of the same name
/// are replaced, so computing twice yields the same series.
pub fn compute_indicators(series: &PriceSeries) -> PriceSeries {
    compute_indicators_with(series, &IndicatorConfig::default())
}

pub fn compute_indicators_with(series: &PriceSeries, cfg: &IndicatorConfig) -> PriceSeries {
    if series.is_empty() {
        return series.clone();
    }

    let closes = series.closes();
    let macd = MacdIndicator::new(cfg.macd_fast, cfg.macd_slow, cfg.macd_signal).series(&closes);
    let bands = BollingerBands::new(cfg.bollinger_period, cfg.bollinger_std).series(&closes);

    with_trend_emas(series)
        .with_indicator(Indicator::Rsi, RsiIndicator::new(cfg.rsi_period).series(&closes))
        .with_indicator(Indicator::Macd, macd.macd)
        .with_indicator(Indicator::MacdSignal, macd.signal)
        .with_indicator(Indicator::MacdHistogram, macd.histogram)
        .with_indicator(Indicator::BollingerUpper, bands.upper)
        .with_indicator(Indicator::BollingerMiddle, bands.middle)
        .with_indicator(Indicator::BollingerLower, bands.lower)
        .with_indicator(
            Indicator::VolumeSma20,
            rolling_mean(&series.volumes(), cfg.volume_sma_period),
        )
}

/// Attach only EMA 50 and EMA 200, the columns the trend rules read.
pub fn with_trend_emas(series: &PriceSeries) -> PriceSeries {
    let closes = series.closes();
    series
        .clone()
        .with_indicator(Indicator::Ema50, EmaIndicator::new(EMA_FAST_PERIOD).series(&closes))
        .with_indicator(Indicator::Ema200, EmaIndicator::new(EMA_SLOW_PERIOD).series(&closes))
}

/// Simple moving average over a trailing window, `NaN` until the window is full.
pub(crate) fn rolling_mean(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }
    let mut sum: f64 = values[..period].iter().sum();
    out[period - 1] = sum / period as f64;
    for i in period..values.len() {
        sum += values[i] - values[i - period];
        out[i] = sum / period as f64;
    }
    out
}
