use super::ema::EmaIndicator;

/// MACD (Moving Average Convergence/Divergence) indicator.
///
/// MACD line = EMA(fast) − EMA(slow), signal = EMA(signal) of the MACD line,
/// histogram = MACD − signal.
#[derive(Debug, Clone)]
pub struct MacdIndicator {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

/// Index-aligned MACD columns.
#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// The MACD columns at one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdPoint {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

impl MacdIndicator {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        assert!(
            fast < slow,
            "MACD fast period must be less than slow period"
        );
        Self { fast, slow, signal }
    }

    /// The MACD line is defined from index `slow - 1`, the signal and
    /// histogram from `slow + signal - 2`.
    pub fn series(&self, closes: &[f64]) -> MacdSeries {
        let fast = EmaIndicator::new(self.fast).series(closes);
        let slow = EmaIndicator::new(self.slow).series(closes);
        let macd: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
        let signal = EmaIndicator::new(self.signal).series(&macd);
        let histogram = macd.iter().zip(&signal).map(|(m, s)| m - s).collect();
        MacdSeries { macd, signal, histogram }
    }

    /// Latest MACD values. Returns `None` until the signal line is defined.
    pub fn compute(&self, closes: &[f64]) -> Option<MacdPoint> {
        let series = self.series(closes);
        let point = MacdPoint {
            macd: *series.macd.last()?,
            signal: *series.signal.last()?,
            histogram: *series.histogram.last()?,
        };
        (!point.histogram.is_nan()).then_some(point)
    }
}
