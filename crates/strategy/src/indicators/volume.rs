use serde::Serialize;

use common::{Indicator, PriceSeries};

use crate::config::VolumeConfig;

/// Latest volume relative to its moving average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VolumeRegime {
    /// Well above average: expect volatility.
    High,
    /// Well below average: the market is waiting.
    Low,
    Normal,
    NotAvailable,
}

impl std::fmt::Display for VolumeRegime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VolumeRegime::High => write!(f, "High (possible volatility)"),
            VolumeRegime::Low => write!(f, "Low (waiting)"),
            VolumeRegime::Normal => write!(f, "Normal"),
            VolumeRegime::NotAvailable => write!(f, "N/A"),
        }
    }
}

/// Classify the latest bar's volume against the attached volume SMA column.
pub fn analyze_volume(series: &PriceSeries) -> VolumeRegime {
    analyze_volume_with(series, &VolumeConfig::default())
}

pub fn analyze_volume_with(series: &PriceSeries, cfg: &VolumeConfig) -> VolumeRegime {
    let (Some(bar), Some(avg)) = (series.last(), series.latest(Indicator::VolumeSma20)) else {
        return VolumeRegime::NotAvailable;
    };

    if bar.volume > avg * cfg.high_ratio {
        VolumeRegime::High
    } else if bar.volume < avg * cfg.low_ratio {
        VolumeRegime::Low
    } else {
        VolumeRegime::Normal
    }
}
