/// Exponential Moving Average seeded with the SMA of its first `period`
/// defined inputs.
///
/// Leading `NaN` inputs are skipped, so the indicator can be chained onto
/// another indicator's output (the MACD signal line is an EMA of the MACD
/// line). Output is index-aligned with the input and `NaN` until the seed
/// window is full.
#[derive(Debug, Clone)]
pub struct EmaIndicator {
    pub period: usize,
}

impl EmaIndicator {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self { period }
    }

    pub fn series(&self, values: &[f64]) -> Vec<f64> {
        let mut out = vec![f64::NAN; values.len()];
        let Some(start) = values.iter().position(|v| !v.is_nan()) else {
            return out;
        };
        let seed_end = start + self.period;
        if seed_end > values.len() {
            return out;
        }

        let k = 2.0 / (self.period as f64 + 1.0);
        let mut ema = values[start..seed_end].iter().sum::<f64>() / self.period as f64;
        out[seed_end - 1] = ema;
        for i in seed_end..values.len() {
            ema = values[i] * k + ema * (1.0 - k);
            out[i] = ema;
        }
        out
    }

    /// Latest EMA value, `None` until `period` values are available.
    pub fn compute(&self, values: &[f64]) -> Option<f64> {
        self.series(values).last().copied().filter(|v| !v.is_nan())
    }
}
