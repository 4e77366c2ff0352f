use chrono::{TimeZone, Utc};

use common::{PriceBar, PriceSeries, Timeframe};

pub(crate) struct SeriesBuilder {
    timeframe: Timeframe,
    bars: Vec<PriceBar>,
}

impl SeriesBuilder {
    pub(crate) fn timeframe(mut self, timeframe: Timeframe) -> Self {
        self.timeframe = timeframe;
        self
    }

    pub(crate) fn with_volumes(mut self, volumes: &[f64]) -> Self {
        for (bar, &v) in self.bars.iter_mut().zip(volumes) {
            bar.volume = v;
        }
        self
    }

    pub(crate) fn build(self) -> PriceSeries {
        PriceSeries::new("BTCUSDT", self.timeframe, self.bars)
    }
}

/// Flat candles (open = high = low = close) at hourly spacing.
pub(crate) fn bars_from(closes: &[f64]) -> SeriesBuilder {
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| bar_at(i, c, c, c, c))
        .collect();
    SeriesBuilder { timeframe: Timeframe::H1, bars }
}

/// Explicit `(open, high, low, close)` candles at hourly spacing.
pub(crate) fn candles(ohlc: &[(f64, f64, f64, f64)]) -> SeriesBuilder {
    let bars = ohlc
        .iter()
        .enumerate()
        .map(|(i, &(o, h, l, c))| bar_at(i, o, h, l, c))
        .collect();
    SeriesBuilder { timeframe: Timeframe::H1, bars }
}

pub(crate) fn rising_closes(n: usize, start: f64, step: f64) -> Vec<f64> {
    (0..n).map(|i| start + i as f64 * step).collect()
}

fn bar_at(i: usize, open: f64, high: f64, low: f64, close: f64) -> PriceBar {
    PriceBar {
        timestamp: Utc.timestamp_opt(1_700_000_000 + i as i64 * 3600, 0).unwrap(),
        open,
        high,
        low,
        close,
        volume: 100.0,
    }
}
