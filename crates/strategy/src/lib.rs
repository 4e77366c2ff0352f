pub mod config;
pub mod correlation;
pub mod indicators;
pub mod levels;
pub mod patterns;
pub mod signal;
pub mod trend;

#[cfg(test)]
mod test_support;

pub use config::AnalysisConfig;
pub use correlation::{correlation_check, correlation_check_with, CorrelationResult, ReferenceTrend};
pub use indicators::{analyze_volume, compute_indicators, compute_indicators_with, VolumeRegime};
pub use levels::{
    cluster_levels, fibonacci_levels, fibonacci_levels_with, historical_levels,
    historical_levels_with, FibRatio, FibonacciLevels, LevelSplit,
};
pub use patterns::{
    detect_patterns, detect_structure, detect_structure_with, CandlePattern, MarketStructure,
};
pub use signal::{
    synthesize_signal, synthesize_signal_with, OpinionLabel, SignalColor, SignalOpinion, TradePlan,
};
pub use trend::{
    classify_trend, confluence, confluence_with, trend_status, ConfluenceLabel, ConfluenceResult,
    TrendReading, TrendStatus,
};
