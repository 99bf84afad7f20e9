use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::Confidence;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    RiskOn,
    Neutral,
    RiskOff,
}

impl Regime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Regime::RiskOn => "risk_on",
            Regime::Neutral => "neutral",
            Regime::RiskOff => "risk_off",
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroOutlook {
    /// -1..1; positive is risk-on.
    pub bias: Decimal,
    pub regime: Regime,
    pub confidence: Confidence,
}

impl Default for MacroOutlook {
    fn default() -> Self {
        Self {
            bias: Decimal::ZERO,
            regime: Regime::Neutral,
            confidence: Confidence::Low,
        }
    }
}

const REGIME_BAND: Decimal = Decimal::from_parts(3, 0, 0, false, 1);
const STABLE_FLOW_BAND_USD: i64 = 100_000_000;

fn fear_greed_bias(index: u8) -> Decimal {
    match index {
        0..=15 => Decimal::new(4, 1),
        16..=25 => Decimal::new(2, 1),
        85..=u8::MAX => Decimal::new(-4, 1),
        75..=84 => Decimal::new(-2, 1),
        _ => Decimal::ZERO,
    }
}

fn funding_bias(rate_pct: Decimal) -> Decimal {
    if rate_pct > Decimal::new(5, 2) {
        Decimal::new(-3, 1)
    } else if rate_pct < Decimal::new(-2, 2) {
        Decimal::new(3, 1)
    } else {
        Decimal::ZERO
    }
}

fn stable_flow_bias(flow_usd: Decimal) -> Decimal {
    let band = Decimal::from(STABLE_FLOW_BAND_USD);
    if flow_usd >= band {
        Decimal::new(2, 1)
    } else if flow_usd <= -band {
        Decimal::new(-2, 1)
    } else {
        Decimal::ZERO
    }
}

/// Risk-on/risk-off bias from sentiment extremes, leverage and stablecoin
/// liquidity. Extreme fear leans risk-on (contrarian).
pub fn macro_outlook(
    fear_greed: Option<u8>,
    btc_funding_pct: Option<Decimal>,
    stable_flow_usd: Option<Decimal>,
) -> MacroOutlook {
    let parts = [
        fear_greed.map(fear_greed_bias),
        btc_funding_pct.map(funding_bias),
        stable_flow_usd.map(stable_flow_bias),
    ];
    let complete = parts.iter().all(Option::is_some);
    let bias: Decimal = parts.iter().flatten().copied().sum();
    let bias = bias.max(-Decimal::ONE).min(Decimal::ONE);

    let regime = if bias >= REGIME_BAND {
        Regime::RiskOn
    } else if bias <= -REGIME_BAND {
        Regime::RiskOff
    } else {
        Regime::Neutral
    };

    MacroOutlook {
        bias,
        regime,
        confidence: if complete {
            Confidence::Normal
        } else {
            Confidence::Low
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
