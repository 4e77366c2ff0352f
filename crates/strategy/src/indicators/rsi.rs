/// RSI (Relative Strength Index) indicator.
///
/// Uses Wilder's smoothed moving average, seeded with the simple average of
/// the first `period` price changes. The first defined value sits at index
/// `period`; everything before it is `NaN`.
#[derive(Debug, Clone)]
pub struct RsiIndicator {
    pub period: usize,
}

impl RsiIndicator {
    pub fn new(period: usize) -> Self {
        assert!(period >= 2, "RSI period must be >= 2");
        Self { period }
    }

    /// RSI for every bar of `closes` (oldest first).
    pub fn series(&self, closes: &[f64]) -> Vec<f64> {
        let mut out = vec![f64::NAN; closes.len()];
        if closes.len() < self.period + 1 {
            return out;
        }

        let changes: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
        let initial = &changes[..self.period];
        let n = self.period as f64;

        let mut avg_gain = initial.iter().filter(|&&c| c > 0.0).sum::<f64>() / n;
        let mut avg_loss = initial.iter().filter(|&&c| c < 0.0).map(|c| c.abs()).sum::<f64>() / n;
        out[self.period] = relative_strength(avg_gain, avg_loss);

        // changes[i] moves the close from bar i to bar i + 1
        for (i, &change) in changes.iter().enumerate().skip(self.period) {
            let gain = change.max(0.0);
            let loss = (-change).max(0.0);
            avg_gain = (avg_gain * (n - 1.0) + gain) / n;
            avg_loss = (avg_loss * (n - 1.0) + loss) / n;
            out[i + 1] = relative_strength(avg_gain, avg_loss);
        }
        out
    }

    /// Latest RSI, `None` if there are fewer than `period + 1` closes.
    pub fn compute(&self, closes: &[f64]) -> Option<f64> {
        self.series(closes).last().copied().filter(|v| !v.is_nan())
    }
}

fn relative_strength(avg_gain: f64, avg_loss: f64) -> f64 {
    match (avg_gain == 0.0, avg_loss == 0.0) {
        // flat window: no momentum either way
        (true, true) => 50.0,
        (_, true) => 100.0,
        _ => 100.0 - 100.0 / (1.0 + avg_gain / avg_loss),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsi_returns_none_when_insufficient_data() {
        let rsi = RsiIndicator::new(14);
        // Need at least period+1 = 15 values
        let prices = vec![100.0; 14];
        assert!(rsi.compute(&prices).is_none());
        assert!(rsi.series(&prices).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn rsi_first_value_lands_on_index_period() {
        let rsi = RsiIndicator::new(14);
        let prices: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        let out = rsi.series(&prices);
        assert!(out[13].is_nan());
        assert!(!out[14].is_nan());
    }

    #[test]
    fn rsi_all_gains_returns_100() {
        let rsi = RsiIndicator::new(3);
        let prices = vec![10.0, 11.0, 12.0, 13.0, 14.0];
        let value = rsi.compute(&prices).unwrap();
        assert!((value - 100.0).abs() < 1e-6, "Expected ~100, got {value}");
    }

    #[test]
    fn rsi_all_losses_returns_0() {
        let rsi = RsiIndicator::new(3);
        let prices = vec![14.0, 13.0, 12.0, 11.0, 10.0];
        let value = rsi.compute(&prices).unwrap();
        assert!((value - 0.0).abs() < 1e-6, "Expected ~0, got {value}");
    }

    #[test]
    fn rsi_flat_prices_sit_at_midpoint() {
        let rsi = RsiIndicator::new(14);
        assert_eq!(rsi.compute(&vec![100.0; 30]), Some(50.0));
    }

    #[test]
    fn rsi_wilder_smoothing_known_value() {
        // period 2: changes +1, -1 → seed gain 0.5, loss 0.5 → 50
        // next change +2 → gain (0.5 + 2)/2 = 1.25, loss 0.25 → RS 5 → 83.33
        let rsi = RsiIndicator::new(2);
        let out = rsi.series(&[10.0, 11.0, 10.0, 12.0]);
        assert!((out[2] - 50.0).abs() < 1e-9);
        assert!((out[3] - (100.0 - 100.0 / 6.0)).abs() < 1e-9);
    }

    #[test]
    fn rsi_stays_in_range() {
        let rsi = RsiIndicator::new(14);
        let prices = vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.15, 43.61, 44.33, 44.83, 45.10,
            45.15, 44.34, 44.09, 44.70, 45.20,
        ];
        for v in rsi.series(&prices).into_iter().filter(|v| !v.is_nan()) {
            assert!((0.0..=100.0).contains(&v), "RSI out of range: {v}");
        }
    }
}
