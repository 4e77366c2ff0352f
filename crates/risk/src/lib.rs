pub mod calculator;

pub use calculator::{
    LeverageCalculator, LeverageScenario, RiskError, RiskReport, SideLevels, DEFAULT_LEVERAGES,
    MAX_RISK_SHARE,
};
