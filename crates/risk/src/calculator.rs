use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Leverages shown when none are configured.
pub const DEFAULT_LEVERAGES: [u32; 3] = [5, 10, 15];

/// Share of capital treated as the absolute loss ceiling.
pub const MAX_RISK_SHARE: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RiskError {
    #[error("capital must be positive, got {0}")]
    InvalidCapital(f64),

    #[error("risk percentage must be within 1..=100, got {0}")]
    InvalidRiskPct(f64),

    #[error("take-profit percentage must be positive, got {0}")]
    InvalidTakeProfit(f64),

    #[error("price must be positive, got {0}")]
    InvalidPrice(f64),

    #[error("leverage must be at least 1x")]
    ZeroLeverage,
}

/// Stop and target for one side of a leveraged position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SideLevels {
    pub stop: f64,
    pub target: f64,
}

/// Outcome of trading the configured capital at one leverage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeverageScenario {
    pub leverage: u32,
    /// Price move that loses `risk_pct` of capital at this leverage.
    pub stop_distance_pct: f64,
    pub long: SideLevels,
    pub short: SideLevels,
    pub potential_profit: f64,
    pub potential_loss: f64,
    /// `None` when the loss is zero.
    pub reward_risk: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskReport {
    pub price: f64,
    pub capital: f64,
    pub risk_pct: f64,
    pub take_profit_pct: f64,
    pub risk_usd: f64,
    pub max_risk_usd: f64,
    pub scenarios: Vec<LeverageScenario>,
}

/// Manual position-sizing helper: for each leverage, how far the stop sits
/// so that hitting it costs `risk_pct` of capital, and what a move of
/// `take_profit_pct` would earn.
///
/// Inputs are validated once in `new`; every computation afterwards is
/// plain arithmetic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeverageCalculator {
    capital: f64,
    risk_pct: f64,
    take_profit_pct: f64,
    leverages: Vec<u32>,
}

impl LeverageCalculator {
    pub fn new(capital: f64, risk_pct: f64, take_profit_pct: f64) -> Result<Self, RiskError> {
        // written as negations so NaN is rejected too
        if !(capital > 0.0) || !capital.is_finite() {
            return Err(RiskError::InvalidCapital(capital));
        }
        if !(1.0..=100.0).contains(&risk_pct) {
            return Err(RiskError::InvalidRiskPct(risk_pct));
        }
        if !(take_profit_pct > 0.0) || !take_profit_pct.is_finite() {
            return Err(RiskError::InvalidTakeProfit(take_profit_pct));
        }
        Ok(Self {
            capital,
            risk_pct,
            take_profit_pct,
            leverages: DEFAULT_LEVERAGES.to_vec(),
        })
    }

    pub fn with_leverages(mut self, leverages: Vec<u32>) -> Result<Self, RiskError> {
        if leverages.contains(&0) {
            return Err(RiskError::ZeroLeverage);
        }
        self.leverages = leverages;
        Ok(self)
    }

    pub fn leverages(&self) -> &[u32] {
        &self.leverages
    }

    pub fn max_risk_usd(&self) -> f64 {
        self.capital * MAX_RISK_SHARE
    }

    pub fn risk_usd(&self) -> f64 {
        self.capital * self.risk_pct / 100.0
    }

    pub fn scenario(&self, price: f64, leverage: u32) -> Result<LeverageScenario, RiskError> {
        if !(price > 0.0) || !price.is_finite() {
            return Err(RiskError::InvalidPrice(price));
        }
        if leverage == 0 {
            return Err(RiskError::ZeroLeverage);
        }

        let lev = f64::from(leverage);
        let sl = self.risk_pct / lev;
        let tp = self.take_profit_pct;

        let potential_profit = self.capital * lev * tp / 100.0;
        let potential_loss = self.capital * lev * sl / 100.0;

        Ok(LeverageScenario {
            leverage,
            stop_distance_pct: sl,
            long: SideLevels {
                stop: price * (1.0 - sl / 100.0),
                target: price * (1.0 + tp / 100.0),
            },
            short: SideLevels {
                stop: price * (1.0 + sl / 100.0),
                target: price * (1.0 - tp / 100.0),
            },
            potential_profit,
            potential_loss,
            reward_risk: (potential_loss > 0.0).then(|| potential_profit / potential_loss),
        })
    }

    /// One scenario per configured leverage, in configured order.
    pub fn report(&self, price: f64) -> Result<RiskReport, RiskError> {
        let scenarios = self
            .leverages
            .iter()
            .map(|&lev| self.scenario(price, lev))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            price,
            capital = self.capital,
            risk_pct = self.risk_pct,
            "Leverage scenarios computed"
        );

        Ok(RiskReport {
            price,
            capital: self.capital,
            risk_pct: self.risk_pct,
            take_profit_pct: self.take_profit_pct,
            risk_usd: self.risk_usd(),
            max_risk_usd: self.max_risk_usd(),
            scenarios,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn budget_figures() {
        let calc = LeverageCalculator::new(1_000.0, 10.0, 2.0).unwrap();
        assert!(approx(calc.max_risk_usd(), 500.0));
        assert!(approx(calc.risk_usd(), 100.0));
        assert_eq!(calc.leverages(), &[5, 10, 15]);
    }

    #[test]
    fn ten_x_scenario() {
        let calc = LeverageCalculator::new(1_000.0, 10.0, 2.0).unwrap();
        let s = calc.scenario(50_000.0, 10).unwrap();

        // 10% of capital over 10x is a 1% stop
        assert!(approx(s.stop_distance_pct, 1.0));
        assert!(approx(s.long.stop, 49_500.0));
        assert!(approx(s.long.target, 51_000.0));
        assert!(approx(s.short.stop, 50_500.0));
        assert!(approx(s.short.target, 49_000.0));
        assert!(approx(s.potential_profit, 200.0));
        assert!(approx(s.potential_loss, 100.0));
        assert!(approx(s.reward_risk.unwrap(), 2.0));
    }

    #[test]
    fn loss_is_constant_across_leverages() {
        let calc = LeverageCalculator::new(2_500.0, 4.0, 3.0).unwrap();
        let report = calc.report(30_000.0).unwrap();

        assert_eq!(report.scenarios.len(), 3);
        for s in &report.scenarios {
            assert!(approx(s.potential_loss, report.risk_usd));
        }
        // tighter stops at higher leverage
        assert!(report.scenarios[0].stop_distance_pct > report.scenarios[2].stop_distance_pct);
        assert!(report.scenarios[0].potential_profit < report.scenarios[2].potential_profit);
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        assert_eq!(LeverageCalculator::new(0.0, 10.0, 2.0), Err(RiskError::InvalidCapital(0.0)));
        assert!(matches!(
            LeverageCalculator::new(f64::NAN, 10.0, 2.0),
            Err(RiskError::InvalidCapital(_))
        ));
        assert_eq!(LeverageCalculator::new(100.0, 0.5, 2.0), Err(RiskError::InvalidRiskPct(0.5)));
        assert_eq!(
            LeverageCalculator::new(100.0, 101.0, 2.0),
            Err(RiskError::InvalidRiskPct(101.0))
        );
        assert_eq!(
            LeverageCalculator::new(100.0, 10.0, 0.0),
            Err(RiskError::InvalidTakeProfit(0.0))
        );

        let calc = LeverageCalculator::new(100.0, 10.0, 2.0).unwrap();
        assert_eq!(calc.scenario(-1.0, 5), Err(RiskError::InvalidPrice(-1.0)));
        assert_eq!(calc.scenario(100.0, 0), Err(RiskError::ZeroLeverage));
        assert_eq!(calc.clone().with_leverages(vec![3, 0]), Err(RiskError::ZeroLeverage));
    }

    #[test]
    fn custom_leverages_keep_order() {
        let calc = LeverageCalculator::new(100.0, 5.0, 1.0)
            .unwrap()
            .with_leverages(vec![20, 2])
            .unwrap();
        let report = calc.report(100.0).unwrap();
        let levs: Vec<u32> = report.scenarios.iter().map(|s| s.leverage).collect();
        assert_eq!(levs, vec![20, 2]);
    }

    #[test]
    fn report_serialises() {
        let report = LeverageCalculator::new(1_000.0, 10.0, 2.0)
            .unwrap()
            .report(50_000.0)
            .unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["scenarios"][1]["leverage"], 10);
        assert_eq!(json["max_risk_usd"], 500.0);
        assert!(json["scenarios"][0]["long"]["stop"].is_number());
    }
}
