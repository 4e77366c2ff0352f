use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use common::{PriceBar, PriceSeries, Timeframe};
use strategy::{cluster_levels, compute_indicators, fibonacci_levels, historical_levels, FibRatio};

fn series_from(closes: &[f64], spread: f64) -> PriceSeries {
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| PriceBar {
            timestamp: Utc.timestamp_opt(1_700_000_000 + i as i64 * 3600, 0).unwrap(),
            open: c,
            high: c + spread,
            low: c - spread,
            close: c,
            volume: 1.0 + i as f64,
        })
        .collect();
    PriceSeries::new("BTCUSDT", Timeframe::H1, bars)
}

proptest! {
    /// Fibonacci levels stay ordered from the swing high down to the swing low.
    #[test]
    fn fibonacci_levels_are_ordered(
        closes in prop::collection::vec(1_000.0f64..100_000.0, 1..250),
        spread in 0.0f64..500.0,
    ) {
        let fib = fibonacci_levels(&series_from(&closes, spread)).unwrap();
        let prices = fib.prices();
        prop_assert_eq!(prices.len(), 6);
        prop_assert!(prices.windows(2).all(|w| w[0] >= w[1]));
        if fib.high != fib.low {
            let half = fib.price(FibRatio::Half);
            let golden = fib.price(FibRatio::R618);
            prop_assert!(golden < half && golden > fib.low);
        }
    }

    /// Clustering never adds levels and emits them ascending.
    #[test]
    fn clusters_are_ascending_and_no_more_than_input(
        mut pivots in prop::collection::vec(1.0f64..100_000.0, 0..200),
        tolerance in 0.0f64..0.1,
    ) {
        pivots.sort_by(f64::total_cmp);
        let clusters = cluster_levels(&pivots, tolerance);
        prop_assert!(clusters.len() <= pivots.len());
        prop_assert!(clusters.windows(2).all(|w| w[0] < w[1]));
    }

    /// Historical levels lie within the series' price range.
    #[test]
    fn historical_levels_stay_within_range(
        closes in prop::collection::vec(1_000.0f64..100_000.0, 0..300),
    ) {
        let series = series_from(&closes, 10.0);
        let levels = historical_levels(&series, 20, 0.02);
        let lo = series.lows().into_iter().fold(f64::INFINITY, f64::min);
        let hi = series.highs().into_iter().fold(f64::NEG_INFINITY, f64::max);
        for level in levels {
            prop_assert!(level >= lo - 1e-6 && level <= hi + 1e-6);
        }
    }

    /// Recomputing indicators on an augmented series changes nothing.
    #[test]
    fn indicators_are_idempotent(
        closes in prop::collection::vec(1_000.0f64..100_000.0, 0..260),
    ) {
        let once = compute_indicators(&series_from(&closes, 5.0));
        let twice = compute_indicators(&once);
        for ((name_a, a), (name_b, b)) in once.indicators().zip(twice.indicators()) {
            prop_assert_eq!(name_a, name_b);
            let a_bits: Vec<u64> = a.iter().map(|v| v.to_bits()).collect();
            let b_bits: Vec<u64> = b.iter().map(|v| v.to_bits()).collect();
            prop_assert_eq!(a_bits, b_bits);
        }
    }
}
