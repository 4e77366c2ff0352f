use serde::Serialize;
use tracing::debug;

use common::PriceSeries;

use crate::config::CorrelationConfig;

/// Direction of the reference index relative to its SMA band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferenceTrend {
    /// Above the band: USD strengthening.
    Rising,
    /// Below the band: USD weakening.
    Falling,
    Neutral,
    #[serde(rename = "N/A")]
    NotAvailable,
}

impl std::fmt::Display for ReferenceTrend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReferenceTrend::Rising => write!(f, "Rising (strong USD)"),
            ReferenceTrend::Falling => write!(f, "Falling (weak USD)"),
            ReferenceTrend::Neutral => write!(f, "Neutral"),
            ReferenceTrend::NotAvailable => write!(f, "N/A"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationResult {
    pub trend: ReferenceTrend,
    /// Set when the index moves against the opinion's direction.
    pub warning: Option<String>,
    /// Last bar's percent change.
    pub change_pct: f64,
}

impl CorrelationResult {
    pub fn not_available() -> Self {
        Self {
            trend: ReferenceTrend::NotAvailable,
            warning: None,
            change_pct: 0.0,
        }
    }
}

pub fn correlation_check(reference: &PriceSeries, opinion: &str) -> CorrelationResult {
    correlation_check_with(reference, opinion, &CorrelationConfig::default())
}

/// Compare the reference index close with its SMA ± `neutral_band` and warn
/// when it runs against `opinion`. The opinion is matched case-insensitively:
/// "long"/"bullish" is a long view, "short"/"bearish" a short one.
pub fn correlation_check_with(
    reference: &PriceSeries,
    opinion: &str,
    cfg: &CorrelationConfig,
) -> CorrelationResult {
    let closes = reference.closes();
    let Some(&last) = closes.last() else {
        return CorrelationResult::not_available();
    };

    let change_pct = match closes.len().checked_sub(2).map(|i| closes[i]) {
        Some(prev) if prev != 0.0 => (last - prev) / prev * 100.0,
        _ => 0.0,
    };

    if cfg.sma_period == 0 || closes.len() < cfg.sma_period {
        debug!(bars = closes.len(), "Reference history shorter than its SMA window");
        return CorrelationResult { trend: ReferenceTrend::Neutral, warning: None, change_pct };
    }
    let window = &closes[closes.len() - cfg.sma_period..];
    let sma = window.iter().sum::<f64>() / cfg.sma_period as f64;

    let opinion = opinion.to_lowercase();
    let is_long = opinion.contains("long") || opinion.contains("bullish");
    let is_short = opinion.contains("short") || opinion.contains("bearish");

    let (trend, warning) = if last > sma * (1.0 + cfg.neutral_band) {
        let warning =
            is_long.then(|| "Reference index rising: risk for long positions!".to_string());
        (ReferenceTrend::Rising, warning)
    } else if last < sma * (1.0 - cfg.neutral_band) {
        let warning =
            is_short.then(|| "Reference index falling: risk for short positions!".to_string());
        (ReferenceTrend::Falling, warning)
    } else {
        (ReferenceTrend::Neutral, None)
    };

    CorrelationResult { trend, warning, change_pct }
}
