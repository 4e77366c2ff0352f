use serde::Serialize;
use tracing::debug;

use common::{Indicator, PriceSeries, Timeframe, TimeframeSet};

use crate::config::{AnalysisConfig, SignalConfig};
use crate::levels::fibonacci_levels_with;
use crate::patterns::{detect_structure_with, MarketStructure};

/// Higher-timeframe directional lean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Bias {
    Long,
    Short,
    Neutral,
}

impl std::fmt::Display for Bias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bias::Long => write!(f, "BULLISH"),
            Bias::Short => write!(f, "BEARISH"),
            Bias::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

/// Short-term (1h) state, interpreted through the bias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MomentumState {
    /// Long bias, price under the 1h EMA 50.
    Pullback,
    /// Long bias, price over the 1h EMA 50.
    Impulse,
    /// Short bias, price over the 1h EMA 50.
    Rally,
    /// Short bias, price under the 1h EMA 50.
    BearishMomentum,
    Consolidation,
}

impl std::fmt::Display for MomentumState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MomentumState::Pullback => write!(f, "PULLBACK"),
            MomentumState::Impulse => write!(f, "BULLISH IMPULSE"),
            MomentumState::Rally => write!(f, "TECHNICAL RALLY"),
            MomentumState::BearishMomentum => write!(f, "BEARISH PUSH"),
            MomentumState::Consolidation => write!(f, "CONSOLIDATION"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RsiRegime {
    Overbought,
    Oversold,
    Neutral,
}

impl std::fmt::Display for RsiRegime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RsiRegime::Overbought => write!(f, "OVERBOUGHT"),
            RsiRegime::Oversold => write!(f, "OVERSOLD"),
            RsiRegime::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

/// Outcome of the RSI safety filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RsiGate {
    Clear,
    /// Entries in the bias direction are forbidden.
    Veto,
    /// RSI favours an entry in the bias direction.
    Opportunity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RsiCheck {
    pub gate: RsiGate,
    pub regime: RsiRegime,
}

impl RsiCheck {
    const CLEAR: RsiCheck = RsiCheck { gate: RsiGate::Clear, regime: RsiRegime::Neutral };

    pub fn can_trade(&self) -> bool {
        self.gate != RsiGate::Veto
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalColor {
    Gray,
    Green,
    LightGreen,
    Red,
    Orange,
}

/// Headline tag of an opinion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OpinionLabel {
    #[serde(rename = "INSUFFICIENT DATA")]
    InsufficientData,
    #[serde(rename = "NEUTRAL")]
    Neutral,
    #[serde(rename = "BULLISH DIP")]
    BullishDip,
    #[serde(rename = "BULLISH MOMENTUM")]
    BullishMomentum,
    #[serde(rename = "BEARISH RALLY")]
    BearishRally,
    #[serde(rename = "BEARISH MOMENTUM")]
    BearishMomentum,
    #[serde(rename = "NEUTRAL (RSI HIGH)")]
    NeutralRsiHigh,
    #[serde(rename = "NEUTRAL (RSI LOW)")]
    NeutralRsiLow,
}

impl OpinionLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpinionLabel::InsufficientData => "INSUFFICIENT DATA",
            OpinionLabel::Neutral => "NEUTRAL",
            OpinionLabel::BullishDip => "BULLISH DIP",
            OpinionLabel::BullishMomentum => "BULLISH MOMENTUM",
            OpinionLabel::BearishRally => "BEARISH RALLY",
            OpinionLabel::BearishMomentum => "BEARISH MOMENTUM",
            OpinionLabel::NeutralRsiHigh => "NEUTRAL (RSI HIGH)",
            OpinionLabel::NeutralRsiLow => "NEUTRAL (RSI LOW)",
        }
    }
}

impl std::fmt::Display for OpinionLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry zone, target and invalidation for a tradeable opinion.
/// `entry_low <= entry_high` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TradePlan {
    pub entry_low: f64,
    pub entry_high: f64,
    pub target: f64,
    pub invalidation: f64,
}

/// The synthesized trading opinion. Always fully populated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalOpinion {
    pub label: OpinionLabel,
    /// Advisory, non-normalized: +5 for a long bias, +2 when trading is allowed.
    pub score: i32,
    pub reasons: Vec<String>,
    pub advice: String,
    pub color: SignalColor,
    pub structure: MarketStructure,
    pub bias: Bias,
    pub momentum: MomentumState,
    pub can_trade: bool,
    pub rsi: f64,
    pub plan: Option<TradePlan>,
}

impl SignalOpinion {
    pub fn insufficient_data() -> Self {
        Self {
            label: OpinionLabel::InsufficientData,
            score: 0,
            reasons: Vec::new(),
            advice: "Insufficient data to generate a reliable signal.".to_string(),
            color: SignalColor::Gray,
            structure: MarketStructure::Undefined,
            bias: Bias::Neutral,
            momentum: MomentumState::Consolidation,
            can_trade: false,
            rsi: 0.0,
            plan: None,
        }
    }

    pub fn is_insufficient(&self) -> bool {
        self.label == OpinionLabel::InsufficientData
    }
}

/// The latest values every stage reads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketReadings {
    pub daily_close: f64,
    pub daily_ema200: f64,
    pub h1_close: f64,
    pub h1_ema50: f64,
    pub h1_ema200: f64,
    pub h1_rsi: f64,
}

impl MarketReadings {
    /// `None` when the daily or 1h series is missing, empty, or lacks a
    /// defined latest value for any required column.
    pub fn from_timeframes(timeframes: &TimeframeSet) -> Option<Self> {
        let daily = timeframes.get(&Timeframe::D1)?;
        let h1 = timeframes.get(&Timeframe::H1)?;
        Some(Self {
            daily_close: latest_close(daily)?,
            daily_ema200: daily.latest(Indicator::Ema200)?,
            h1_close: latest_close(h1)?,
            h1_ema50: h1.latest(Indicator::Ema50)?,
            h1_ema200: h1.latest(Indicator::Ema200)?,
            h1_rsi: h1.latest(Indicator::Rsi)?,
        })
    }
}

fn latest_close(series: &PriceSeries) -> Option<f64> {
    series.last().map(|b| b.close).filter(|c| !c.is_nan())
}

pub fn primary_bias(daily_close: f64, daily_ema200: f64) -> Bias {
    if daily_close > daily_ema200 {
        Bias::Long
    } else if daily_close < daily_ema200 {
        Bias::Short
    } else {
        Bias::Neutral
    }
}

pub fn momentum_state(bias: Bias, h1_close: f64, h1_ema50: f64) -> MomentumState {
    match bias {
        Bias::Long if h1_close < h1_ema50 => MomentumState::Pullback,
        Bias::Long if h1_close > h1_ema50 => MomentumState::Impulse,
        Bias::Short if h1_close > h1_ema50 => MomentumState::Rally,
        Bias::Short if h1_close < h1_ema50 => MomentumState::BearishMomentum,
        _ => MomentumState::Consolidation,
    }
}

/// Thresholds are strict: RSI exactly at a threshold passes through.
pub fn rsi_filter(bias: Bias, rsi: f64, cfg: &SignalConfig) -> RsiCheck {
    match bias {
        Bias::Long if rsi > cfg.long_overbought_veto => {
            RsiCheck { gate: RsiGate::Veto, regime: RsiRegime::Overbought }
        }
        Bias::Long if rsi < cfg.long_oversold_opportunity => {
            RsiCheck { gate: RsiGate::Opportunity, regime: RsiRegime::Oversold }
        }
        Bias::Short if rsi < cfg.short_oversold_veto => {
            RsiCheck { gate: RsiGate::Veto, regime: RsiRegime::Oversold }
        }
        Bias::Short if rsi > cfg.short_overbought_opportunity => {
            RsiCheck { gate: RsiGate::Opportunity, regime: RsiRegime::Overbought }
        }
        _ => RsiCheck::CLEAR,
    }
}

pub fn opinion_label(bias: Bias, momentum: MomentumState, rsi: RsiCheck) -> OpinionLabel {
    match (bias, rsi.gate, momentum) {
        (Bias::Long, RsiGate::Veto, _) => OpinionLabel::NeutralRsiHigh,
        (Bias::Short, RsiGate::Veto, _) => OpinionLabel::NeutralRsiLow,
        (_, _, MomentumState::Pullback) => OpinionLabel::BullishDip,
        (_, _, MomentumState::Impulse) => OpinionLabel::BullishMomentum,
        (_, _, MomentumState::Rally) => OpinionLabel::BearishRally,
        (_, _, MomentumState::BearishMomentum) => OpinionLabel::BearishMomentum,
        (_, _, MomentumState::Consolidation) => OpinionLabel::Neutral,
    }
}

/// Entry/target/invalidation from the 1h Fibonacci levels.
///
/// Supports are the levels under the close (nearest first), resistances the
/// levels over it. A side with fewer than two levels is filled with fixed
/// offsets from the close, so supports stay below price and resistances
/// above it. A neutral bias has no plan.
pub fn operational_levels(
    bias: Bias,
    h1: &PriceSeries,
    readings: &MarketReadings,
    cfg: &AnalysisConfig,
) -> Option<TradePlan> {
    if bias == Bias::Neutral {
        return None;
    }
    let close = readings.h1_close;
    let signal = &cfg.signal;

    let prices = fibonacci_levels_with(h1, &cfg.levels)
        .map(|fib| fib.prices())
        .unwrap_or_default();
    let mut supports: Vec<f64> = prices.iter().copied().filter(|&p| p < close).collect();
    let mut resistances: Vec<f64> = prices.iter().copied().filter(|&p| p > close).collect();
    supports.sort_by(|a, b| b.total_cmp(a));
    resistances.sort_by(f64::total_cmp);

    let support_1 = supports.first().copied().unwrap_or(close * (1.0 - signal.near_fallback_pct));
    let support_2 = supports.get(1).copied().unwrap_or(close * (1.0 - signal.far_fallback_pct));
    let resistance_1 = resistances
        .first()
        .copied()
        .unwrap_or(close * (1.0 + signal.near_fallback_pct));
    let resistance_2 = resistances
        .get(1)
        .copied()
        .unwrap_or(close * (1.0 + signal.far_fallback_pct));

    let (zone_a, zone_b, target, invalidation) = match bias {
        Bias::Long => (
            support_2,
            support_1,
            resistance_1,
            readings.h1_ema200 * (1.0 - signal.invalidation_buffer),
        ),
        Bias::Short => (
            resistance_1,
            resistance_2,
            support_1,
            readings.h1_ema200 * (1.0 + signal.invalidation_buffer),
        ),
        Bias::Neutral => return None,
    };

    Some(TradePlan {
        entry_low: zone_a.min(zone_b),
        entry_high: zone_a.max(zone_b),
        target,
        invalidation,
    })
}

pub fn color_for(bias: Bias, momentum: MomentumState, can_trade: bool) -> SignalColor {
    if !can_trade {
        return SignalColor::Gray;
    }
    match (bias, momentum) {
        (Bias::Long, MomentumState::Pullback) => SignalColor::Green,
        (Bias::Long, MomentumState::Impulse) => SignalColor::LightGreen,
        (Bias::Short, MomentumState::Rally) => SignalColor::Red,
        (Bias::Short, MomentumState::BearishMomentum) => SignalColor::Orange,
        _ => SignalColor::Gray,
    }
}

pub fn score_for(bias: Bias, can_trade: bool) -> i32 {
    let mut score = 0;
    if bias == Bias::Long {
        score += 5;
    }
    if can_trade {
        score += 2;
    }
    score
}

pub fn synthesize_signal(timeframes: &TimeframeSet) -> SignalOpinion {
    synthesize_signal_with(timeframes, &AnalysisConfig::default())
}

/// Run the full decision ladder over the daily and 1h series of `timeframes`.
/// The 4h series, if present, is not consulted.
///
/// Stages run in a fixed order, each a pure function:
///
/// 1. primary bias from the daily close vs. the daily EMA 200;
/// 2. momentum state from the 1h close vs. the 1h EMA 50, read through the bias;
/// 3. RSI gate, which may veto trading without touching the labels above;
/// 4. operational levels (entry zone, target, invalidation) when trading is allowed;
/// 5. color and score.
pub fn synthesize_signal_with(timeframes: &TimeframeSet, cfg: &AnalysisConfig) -> SignalOpinion {
    let (Some(readings), Some(h1)) = (
        MarketReadings::from_timeframes(timeframes),
        timeframes.get(&Timeframe::H1),
    ) else {
        debug!("Insufficient data for signal synthesis");
        return SignalOpinion::insufficient_data();
    };

    let structure = detect_structure_with(h1, &cfg.structure);
    let bias = primary_bias(readings.daily_close, readings.daily_ema200);
    let momentum = momentum_state(bias, readings.h1_close, readings.h1_ema50);
    let rsi = rsi_filter(bias, readings.h1_rsi, &cfg.signal);
    let can_trade = rsi.can_trade();
    let plan = if can_trade {
        operational_levels(bias, h1, &readings, cfg)
    } else {
        None
    };

    let opinion = SignalOpinion {
        label: opinion_label(bias, momentum, rsi),
        score: score_for(bias, can_trade),
        reasons: reasons(bias, momentum, rsi, &cfg.signal),
        advice: advice(bias, momentum, rsi, readings.h1_rsi, plan.as_ref(), &cfg.signal),
        color: color_for(bias, momentum, can_trade),
        structure,
        bias,
        momentum,
        can_trade,
        rsi: readings.h1_rsi,
        plan,
    };
    debug!(label = %opinion.label, score = opinion.score, can_trade, "Signal synthesized");
    opinion
}

/// Reasons in evaluation order: bias, momentum, RSI.
fn reasons(bias: Bias, momentum: MomentumState, rsi: RsiCheck, cfg: &SignalConfig) -> Vec<String> {
    let mut reasons = Vec::new();
    match bias {
        Bias::Long => reasons.push("Daily bias: BULLISH (price > EMA 200).".to_string()),
        Bias::Short => reasons.push("Daily bias: BEARISH (price < EMA 200).".to_string()),
        Bias::Neutral => {}
    }
    match momentum {
        MomentumState::Pullback => reasons.push("H1: price < EMA 50 (pullback).".to_string()),
        MomentumState::Impulse => reasons.push("H1: price > EMA 50 (trend pushing).".to_string()),
        MomentumState::Rally => reasons.push("H1: price > EMA 50 (technical rally).".to_string()),
        MomentumState::BearishMomentum => {
            reasons.push("H1: price < EMA 50 (bearish trend active).".to_string())
        }
        MomentumState::Consolidation => {}
    }
    match (bias, rsi.gate) {
        (Bias::Long, RsiGate::Veto) => reasons.push(format!(
            "RSI > {:.0}: overbought market. No long entries.",
            cfg.long_overbought_veto
        )),
        (Bias::Long, RsiGate::Opportunity) => reasons.push(format!(
            "RSI < {:.0}: oversold market (opportunity).",
            cfg.long_oversold_opportunity
        )),
        (Bias::Short, RsiGate::Veto) => reasons.push(format!(
            "RSI < {:.0}: oversold market. No short entries.",
            cfg.short_oversold_veto
        )),
        (Bias::Short, RsiGate::Opportunity) => reasons.push(format!(
            "RSI > {:.0}: technical rally (short opportunity).",
            cfg.short_overbought_opportunity
        )),
        _ => {}
    }
    reasons
}

fn advice(
    bias: Bias,
    momentum: MomentumState,
    rsi: RsiCheck,
    h1_rsi: f64,
    plan: Option<&TradePlan>,
    cfg: &SignalConfig,
) -> String {
    let context = format!(
        "The primary trend (daily) is [{bias}]. Short term (1h) the market is in [{momentum}]. \
         Current RSI is [{h1_rsi:.1}], the market is [{}].",
        rsi.regime
    );

    let operational = match (bias, rsi.gate, plan) {
        (Bias::Long, RsiGate::Veto, _) => format!(
            "Euphoric market (RSI > {:.0}). Do not enter now, risk of an immediate correction.",
            cfg.long_overbought_veto
        ),
        (Bias::Short, RsiGate::Veto, _) => format!(
            "Exhausted market (RSI < {:.0}). Do not short now, risk of a bounce.",
            cfg.short_oversold_veto
        ),
        (Bias::Long, _, Some(plan)) => format!(
            "Do not trade against the primary trend. WAIT for price to pull back into the \
             value zone between {} and {}. Look for a LONG entry only on a test of these supports. \
             Stop loss: below {}. Take profit: first target at {}.",
            format_usd(plan.entry_high),
            format_usd(plan.entry_low),
            format_usd(plan.invalidation),
            format_usd(plan.target),
        ),
        (Bias::Short, _, Some(plan)) => format!(
            "Do not trade against the primary trend. WAIT for price to bounce into the supply zone \
             between {} and {}. Look for a SHORT entry only on a test of these resistances. \
             Stop loss: above {}. Take profit: first target at {}.",
            format_usd(plan.entry_low),
            format_usd(plan.entry_high),
            format_usd(plan.invalidation),
            format_usd(plan.target),
        ),
        _ => String::new(),
    };

    format!("{context}\n\nOPERATIONAL ADVICE: \"{operational}\"")
}

/// Whole dollars with thousands separators, e.g. `$48,944`.
fn format_usd(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{bars_from, candles};

    fn daily(close: f64, ema200: f64) -> PriceSeries {
        bars_from(&[close])
            .timeframe(Timeframe::D1)
            .build()
            .with_indicator(Indicator::Ema200, vec![ema200])
    }

    /// 1h series spanning 44,000 to 52,000 and closing at `close`.
    fn hourly(close: f64, ema50: f64, ema200: f64, rsi: f64) -> PriceSeries {
        candles(&[
            (46000.0, 52000.0, 44000.0, 47000.0),
            (47000.0, close.max(47000.0), close.min(46800.0), close),
        ])
            .build()
            .with_indicator(Indicator::Ema50, vec![f64::NAN, ema50])
            .with_indicator(Indicator::Ema200, vec![f64::NAN, ema200])
            .with_indicator(Indicator::Rsi, vec![f64::NAN, rsi])
    }

    fn set(daily: PriceSeries, hourly: PriceSeries) -> TimeframeSet {
        TimeframeSet::from([(Timeframe::D1, daily), (Timeframe::H1, hourly)])
    }

    #[test]
    fn bullish_dip_is_tradeable() {
        let opinion = synthesize_signal(&set(
            daily(50000.0, 45000.0),
            hourly(48000.0, 49000.0, 47000.0, 50.0),
        ));

        assert_eq!(opinion.bias, Bias::Long);
        assert_eq!(opinion.momentum, MomentumState::Pullback);
        assert_eq!(opinion.label, OpinionLabel::BullishDip);
        assert!(opinion.can_trade);
        assert_eq!(opinion.color, SignalColor::Green);
        assert_eq!(opinion.score, 7);
        assert_eq!(opinion.reasons.len(), 2);
        assert!(opinion.reasons[0].starts_with("Daily bias: BULLISH"));

        // fib over 52k..44k: 50% sits on the close and is dropped
        let plan = opinion.plan.expect("tradeable opinion has a plan");
        assert!((plan.entry_low - 44000.0).abs() < 1e-6);
        assert!((plan.entry_high - 47056.0).abs() < 1e-6);
        assert!((plan.target - 48944.0).abs() < 1e-6);
        assert!((plan.invalidation - 46530.0).abs() < 1e-6);
        assert!(opinion.advice.contains("$47,056"));
        assert!(opinion.advice.contains("Stop loss: below $46,530"));
    }

    #[test]
    fn overbought_rsi_vetoes_the_long() {
        let opinion = synthesize_signal(&set(
            daily(50000.0, 45000.0),
            hourly(48000.0, 49000.0, 47000.0, 75.0),
        ));

        assert_eq!(opinion.label, OpinionLabel::NeutralRsiHigh);
        assert!(!opinion.can_trade);
        // labels recorded before the veto stay put
        assert_eq!(opinion.momentum, MomentumState::Pullback);
        assert!(opinion.reasons.iter().any(|r| r.contains("overbought")));
        assert_eq!(opinion.color, SignalColor::Gray);
        assert_eq!(opinion.score, 5);
        assert!(opinion.plan.is_none());
        assert!(opinion.advice.contains("Do not enter now"));
    }

    #[test]
    fn bearish_rally_with_rsi_opportunity() {
        let opinion = synthesize_signal(&set(
            daily(40000.0, 45000.0),
            hourly(48000.0, 47000.0, 50000.0, 66.0),
        ));

        assert_eq!(opinion.label, OpinionLabel::BearishRally);
        assert_eq!(opinion.color, SignalColor::Red);
        assert_eq!(opinion.score, 2);
        assert_eq!(opinion.reasons.len(), 3);
        assert!(opinion.reasons[2].contains("short opportunity"));

        let plan = opinion.plan.unwrap();
        assert!(plan.entry_low > 48000.0);
        assert!(plan.entry_low <= plan.entry_high);
        assert!(plan.target < 48000.0);
        assert!((plan.invalidation - 50500.0).abs() < 1e-6);
        // the levels advice replaces the RSI opportunity text
        assert!(opinion.advice.contains("SHORT entry"));
    }

    #[test]
    fn oversold_rsi_vetoes_the_short() {
        let opinion = synthesize_signal(&set(
            daily(40000.0, 45000.0),
            hourly(48000.0, 49000.0, 50000.0, 25.0),
        ));
        assert_eq!(opinion.momentum, MomentumState::BearishMomentum);
        assert_eq!(opinion.label, OpinionLabel::NeutralRsiLow);
        assert_eq!(opinion.score, 0);
        assert!(opinion.plan.is_none());
    }

    #[test]
    fn neutral_bias_keeps_reasons_minimal() {
        let opinion = synthesize_signal(&set(
            daily(45000.0, 45000.0),
            hourly(48000.0, 49000.0, 47000.0, 50.0),
        ));
        assert_eq!(opinion.bias, Bias::Neutral);
        assert_eq!(opinion.label, OpinionLabel::Neutral);
        assert!(opinion.reasons.is_empty());
        assert!(opinion.can_trade);
        assert_eq!(opinion.score, 2);
        assert_eq!(opinion.color, SignalColor::Gray);
        assert!(opinion.plan.is_none());
        assert!(opinion.advice.ends_with("OPERATIONAL ADVICE: \"\""));
    }

    #[test]
    fn missing_inputs_yield_the_sentinel() {
        let h1 = hourly(48000.0, 49000.0, 47000.0, 50.0);
        let only_h1 = TimeframeSet::from([(Timeframe::H1, h1.clone())]);
        assert_eq!(synthesize_signal(&only_h1), SignalOpinion::insufficient_data());

        let empty_daily = set(PriceSeries::empty("BTCUSDT", Timeframe::D1), h1.clone());
        assert!(synthesize_signal(&empty_daily).is_insufficient());

        // daily EMA 200 still undefined
        let nan_ema = set(daily(50000.0, f64::NAN), h1);
        let opinion = synthesize_signal(&nan_ema);
        assert!(opinion.is_insufficient());
        assert_eq!(opinion.score, 0);
        assert_eq!(opinion.color, SignalColor::Gray);
        assert!(opinion.reasons.is_empty());

        let no_rsi = set(
            daily(50000.0, 45000.0),
            bars_from(&[48000.0])
                .build()
                .with_indicator(Indicator::Ema50, vec![49000.0])
                .with_indicator(Indicator::Ema200, vec![47000.0]),
        );
        assert!(synthesize_signal(&no_rsi).is_insufficient());
    }

    #[test]
    fn bias_and_momentum_table() {
        assert_eq!(primary_bias(2.0, 1.0), Bias::Long);
        assert_eq!(primary_bias(1.0, 2.0), Bias::Short);
        assert_eq!(primary_bias(1.0, 1.0), Bias::Neutral);

        assert_eq!(momentum_state(Bias::Long, 1.0, 2.0), MomentumState::Pullback);
        assert_eq!(momentum_state(Bias::Long, 2.0, 1.0), MomentumState::Impulse);
        assert_eq!(momentum_state(Bias::Short, 2.0, 1.0), MomentumState::Rally);
        assert_eq!(momentum_state(Bias::Short, 1.0, 2.0), MomentumState::BearishMomentum);
        assert_eq!(momentum_state(Bias::Long, 1.0, 1.0), MomentumState::Consolidation);
        assert_eq!(momentum_state(Bias::Neutral, 1.0, 2.0), MomentumState::Consolidation);
    }

    #[test]
    fn rsi_thresholds_are_strict() {
        let cfg = SignalConfig::default();
        assert!(rsi_filter(Bias::Long, 70.0, &cfg).can_trade());
        assert_eq!(rsi_filter(Bias::Long, 70.1, &cfg).gate, RsiGate::Veto);
        assert_eq!(rsi_filter(Bias::Long, 34.9, &cfg).gate, RsiGate::Opportunity);
        assert_eq!(rsi_filter(Bias::Short, 29.9, &cfg).gate, RsiGate::Veto);
        assert_eq!(rsi_filter(Bias::Short, 65.1, &cfg).gate, RsiGate::Opportunity);
        assert_eq!(rsi_filter(Bias::Neutral, 95.0, &cfg), RsiCheck::CLEAR);
    }

    #[test]
    fn color_and_score_table() {
        assert_eq!(color_for(Bias::Long, MomentumState::Impulse, true), SignalColor::LightGreen);
        assert_eq!(
            color_for(Bias::Short, MomentumState::BearishMomentum, true),
            SignalColor::Orange
        );
        assert_eq!(color_for(Bias::Long, MomentumState::Pullback, false), SignalColor::Gray);
        assert_eq!(score_for(Bias::Long, true), 7);
        assert_eq!(score_for(Bias::Short, true), 2);
        assert_eq!(score_for(Bias::Short, false), 0);
    }

    #[test]
    fn fallback_levels_respect_geometry() {
        // a flat 1h series: every Fibonacci level equals the close
        let h1 = bars_from(&[48000.0]).build();
        let readings = MarketReadings {
            daily_close: 50000.0,
            daily_ema200: 45000.0,
            h1_close: 48000.0,
            h1_ema50: 49000.0,
            h1_ema200: 47000.0,
            h1_rsi: 50.0,
        };
        let cfg = AnalysisConfig::default();

        let long = operational_levels(Bias::Long, &h1, &readings, &cfg).unwrap();
        assert!((long.entry_low - 46080.0).abs() < 1e-6);
        assert!((long.entry_high - 47040.0).abs() < 1e-6);
        assert!((long.target - 48960.0).abs() < 1e-6);

        let short = operational_levels(Bias::Short, &h1, &readings, &cfg).unwrap();
        assert!(short.entry_low > readings.h1_close);
        assert!(short.target < readings.h1_close);

        assert!(operational_levels(Bias::Neutral, &h1, &readings, &cfg).is_none());
    }

    #[test]
    fn opinion_serialises_with_display_tags() {
        let json = serde_json::to_value(SignalOpinion::insufficient_data()).unwrap();
        assert_eq!(json["label"], "INSUFFICIENT DATA");
        assert_eq!(json["color"], "gray");
        assert_eq!(json["structure"], "UNDEFINED");
        assert!(json["plan"].is_null());
    }

    #[test]
    fn usd_formatting() {
        assert_eq!(format_usd(48943.6), "$48,944");
        assert_eq!(format_usd(999.4), "$999");
        assert_eq!(format_usd(1234567.0), "$1,234,567");
        assert_eq!(format_usd(-1500.0), "-$1,500");
    }
}
