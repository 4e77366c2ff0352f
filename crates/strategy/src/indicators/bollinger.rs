use super::rolling_mean;

/// Bollinger Bands: rolling SMA ± `num_std` population standard deviations.
#[derive(Debug, Clone)]
pub struct BollingerBands {
    pub period: usize,
    pub num_std: f64,
}

/// Index-aligned band columns, `NaN` until `period` closes are available.
#[derive(Debug, Clone, PartialEq)]
pub struct BollingerSeries {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

impl BollingerBands {
    pub fn new(period: usize, num_std: f64) -> Self {
        assert!(period >= 1, "Bollinger period must be >= 1");
        Self { period, num_std }
    }

    pub fn series(&self, closes: &[f64]) -> BollingerSeries {
        let middle = rolling_mean(closes, self.period);
        let mut upper = vec![f64::NAN; closes.len()];
        let mut lower = vec![f64::NAN; closes.len()];

        for (i, &mean) in middle.iter().enumerate() {
            if mean.is_nan() {
                continue;
            }
            let window = &closes[i + 1 - self.period..=i];
            let variance =
                window.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / self.period as f64;
            let width = self.num_std * variance.sqrt();
            upper[i] = mean + width;
            lower[i] = mean - width;
        }

        BollingerSeries { upper, middle, lower }
    }
}
