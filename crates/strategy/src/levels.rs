use serde::ser::{Serialize, SerializeMap, Serializer};

use common::PriceSeries;

use crate::config::LevelConfig;

/// The six fixed retracement ratios, from the swing high down to the swing low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FibRatio {
    Zero,
    R236,
    R382,
    Half,
    R618,
    Full,
}

impl FibRatio {
    pub const ALL: [FibRatio; 6] = [
        FibRatio::Zero,
        FibRatio::R236,
        FibRatio::R382,
        FibRatio::Half,
        FibRatio::R618,
        FibRatio::Full,
    ];

    pub fn ratio(&self) -> f64 {
        match self {
            FibRatio::Zero => 0.0,
            FibRatio::R236 => 0.236,
            FibRatio::R382 => 0.382,
            FibRatio::Half => 0.5,
            FibRatio::R618 => 0.618,
            FibRatio::Full => 1.0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FibRatio::Zero => "0.0%",
            FibRatio::R236 => "23.6%",
            FibRatio::R382 => "38.2%",
            FibRatio::Half => "50.0%",
            FibRatio::R618 => "61.8%",
            FibRatio::Full => "100.0%",
        }
    }
}

impl std::fmt::Display for FibRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Retracement levels spanned by one high/low window.
///
/// Serialises as a `label → price` map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FibonacciLevels {
    pub high: f64,
    pub low: f64,
}

impl FibonacciLevels {
    pub fn price(&self, ratio: FibRatio) -> f64 {
        match ratio {
            FibRatio::Zero => self.high,
            FibRatio::Full => self.low,
            r => self.high - r.ratio() * (self.high - self.low),
        }
    }

    pub fn levels(&self) -> [(FibRatio, f64); 6] {
        FibRatio::ALL.map(|r| (r, self.price(r)))
    }

    pub fn prices(&self) -> Vec<f64> {
        self.levels().iter().map(|(_, p)| *p).collect()
    }
}

impl Serialize for FibonacciLevels {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(FibRatio::ALL.len()))?;
        for (ratio, price) in self.levels() {
            map.serialize_entry(ratio.label(), &price)?;
        }
        map.end()
    }
}

/// Fibonacci retracement over the default 100-bar lookback.
pub fn fibonacci_levels(series: &PriceSeries) -> Option<FibonacciLevels> {
    fibonacci_levels_with(series, &LevelConfig::default())
}

/// Retracement between the highest high and lowest low of the trailing
/// `fibonacci_lookback` bars. A shorter series simply uses every bar;
/// an empty one has no levels.
pub fn fibonacci_levels_with(series: &PriceSeries, cfg: &LevelConfig) -> Option<FibonacciLevels> {
    let window = series.tail(cfg.fibonacci_lookback);
    if window.is_empty() {
        return None;
    }
    let high = window.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    let low = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    Some(FibonacciLevels { high, low })
}

/// Long-term support/resistance from clustered pivot highs and lows.
///
/// A bar is a pivot high when its high equals the maximum high of the
/// centred `window` around it (pivot lows mirror this). All pivots are
/// sorted and merged by `cluster_levels`.
pub fn historical_levels(series: &PriceSeries, window: usize, tolerance: f64) -> Vec<f64> {
    if series.is_empty() || window == 0 {
        return Vec::new();
    }

    let highs = series.highs();
    let lows = series.lows();
    let mut pivots: Vec<f64> = pivot_indices(&highs, window, f64::max)
        .map(|i| highs[i])
        .chain(pivot_indices(&lows, window, f64::min).map(|i| lows[i]))
        .collect();
    pivots.sort_by(f64::total_cmp);

    cluster_levels(&pivots, tolerance)
}

pub fn historical_levels_with(series: &PriceSeries, cfg: &LevelConfig) -> Vec<f64> {
    historical_levels(series, cfg.pivot_window, cfg.pivot_tolerance)
}

/// Indices whose value equals the `pick`-extreme of their centred window.
///
/// For width `w` the window of bar `i` covers `i - w/2 ..= i + (w-1)/2`;
/// bars too close to either edge for a full window never qualify.
fn pivot_indices<'a>(
    values: &'a [f64],
    window: usize,
    pick: fn(f64, f64) -> f64,
) -> impl Iterator<Item = usize> + 'a {
    let before = window / 2;
    let after = (window - 1) / 2;
    (before..values.len().saturating_sub(after)).filter(move |&i| {
        let extreme = values[i - before..=i + after]
            .iter()
            .copied()
            .reduce(pick)
            .unwrap_or(f64::NAN);
        values[i] == extreme
    })
}

/// Greedy left-to-right merge of ascending `sorted` prices.
///
/// A value joins the open cluster while it is within `tolerance` of the
/// cluster's last member; otherwise the cluster is closed and a new one
/// starts. Each cluster is emitted as its arithmetic mean.
pub fn cluster_levels(sorted: &[f64], tolerance: f64) -> Vec<f64> {
    let Some((&first, rest)) = sorted.split_first() else {
        return Vec::new();
    };

    let mut merged = Vec::new();
    let mut cluster = vec![first];
    for &value in rest {
        let last = cluster[cluster.len() - 1];
        if value <= last * (1.0 + tolerance) {
            cluster.push(value);
        } else {
            merged.push(mean(&cluster));
            cluster = vec![value];
        }
    }
    merged.push(mean(&cluster));
    merged
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Levels on either side of a price: supports nearest-first (descending),
/// resistances nearest-first (ascending). Levels equal to the price are dropped.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct LevelSplit {
    pub supports: Vec<f64>,
    pub resistances: Vec<f64>,
}

impl LevelSplit {
    pub fn around(levels: &[f64], price: f64) -> Self {
        let mut supports: Vec<f64> = levels.iter().copied().filter(|&l| l < price).collect();
        let mut resistances: Vec<f64> = levels.iter().copied().filter(|&l| l > price).collect();
        supports.sort_by(|a, b| b.total_cmp(a));
        resistances.sort_by(f64::total_cmp);
        Self { supports, resistances }
    }

    /// Keep only the `n` nearest levels on each side.
    pub fn nearest(mut self, n: usize) -> Self {
        self.supports.truncate(n);
        self.resistances.truncate(n);
        self
    }
}
