use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::Confidence;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    StrongBullish,
    Bullish,
    Neutral,
    Bearish,
    StrongBearish,
}

impl SentimentLabel {
    pub fn from_score(score: Decimal) -> Self {
        if score >= Decimal::from(60) {
            SentimentLabel::StrongBullish
        } else if score >= Decimal::from(20) {
            SentimentLabel::Bullish
        } else if score <= Decimal::from(-60) {
            SentimentLabel::StrongBearish
        } else if score <= Decimal::from(-20) {
            SentimentLabel::Bearish
        } else {
            SentimentLabel::Neutral
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SentimentLabel::StrongBullish => "Strong Bullish",
            SentimentLabel::Bullish => "Bullish",
            SentimentLabel::Neutral => "Neutral",
            SentimentLabel::Bearish => "Bearish",
            SentimentLabel::StrongBearish => "Strong Bearish",
        };
        f.write_str(s)
    }
}

/// Raw inputs. `None` means the source was unavailable this cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SentimentInputs {
    /// 24h stablecoin inflow into tier-1 exchanges.
    pub smart_money_flow_usd: Option<Decimal>,
    /// BTC perp funding, percent.
    pub btc_funding_pct: Option<Decimal>,
    /// 24h stablecoin inflow across tracked chains.
    pub chain_stable_flow_usd: Option<Decimal>,
    pub fear_greed: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentFactor {
    pub name: String,
    pub input: Option<Decimal>,
    pub score: Decimal,
    pub weight: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentScore {
    /// -100..100.
    pub score: Decimal,
    pub label: SentimentLabel,
    pub factors: Vec<SentimentFactor>,
    pub missing: Vec<String>,
    pub confidence: Confidence,
}

fn usd_m(m: i64) -> Decimal {
    Decimal::from(m * 1_000_000)
}

pub fn smart_money_score(flow: Decimal) -> Decimal {
    let score = if flow > usd_m(50) {
        100
    } else if flow > usd_m(10) {
        75
    } else if flow > Decimal::ZERO {
        25
    } else if flow < usd_m(-50) {
        -100
    } else if flow < usd_m(-10) {
        -75
    } else if flow < Decimal::ZERO {
        -25
    } else {
        0
    };
    Decimal::from(score)
}

/// High positive funding means crowded longs (bearish); deeply negative
/// funding means crowded shorts (bullish).
pub fn funding_score(rate_pct: Decimal) -> Decimal {
    let score = if rate_pct > Decimal::new(3, 2) {
        -80
    } else if rate_pct > Decimal::new(1, 2) {
        -40
    } else if rate_pct < Decimal::new(-2, 2) {
        90
    } else if rate_pct < Decimal::new(-1, 2) {
        60
    } else {
        10
    };
    Decimal::from(score)
}

pub fn chain_flow_score(flow: Decimal) -> Decimal {
    let score = if flow > usd_m(20) {
        100
    } else if flow > Decimal::ZERO {
        50
    } else {
        -50
    };
    Decimal::from(score)
}

/// Contrarian: fear is a buying signal.
pub fn fear_greed_score(index: u8) -> Decimal {
    let score = match index {
        0..=19 => 80,
        20..=39 => 40,
        81..=u8::MAX => -80,
        61..=80 => -40,
        _ => 0,
    };
    Decimal::from(score)
}

/// Weighted composite of four factors: smart-money stable flow (40%),
/// funding structure (30%), on-chain stable flow (20%), contrarian fear/greed
/// (10%). Missing factors score zero and lower the confidence.
pub fn composite_sentiment(inputs: &SentimentInputs) -> SentimentScore {
    let table: [(&str, Option<Decimal>, Decimal, fn(Decimal) -> Decimal); 4] = [
        ("smart_money_flow", inputs.smart_money_flow_usd, Decimal::new(4, 1), smart_money_score),
        ("funding_structure", inputs.btc_funding_pct, Decimal::new(3, 1), funding_score),
        ("chain_stable_flow", inputs.chain_stable_flow_usd, Decimal::new(2, 1), chain_flow_score),
        (
            "fear_greed",
            inputs.fear_greed.map(Decimal::from),
            Decimal::new(1, 1),
            |v| fear_greed_score(v.to_u8().unwrap_or(50)),
        ),
    ];

    let mut factors = Vec::with_capacity(table.len());
    let mut missing = Vec::new();
    let mut total = Decimal::ZERO;

    for (name, input, weight, score_fn) in table {
        let score = match input {
            Some(v) => score_fn(v),
            None => {
                missing.push(name.to_string());
                Decimal::ZERO
            }
        };
        total += score * weight;
        factors.push(SentimentFactor {
            name: name.to_string(),
            input,
            score,
            weight,
        });
    }

    let score = total.max(Decimal::from(-100)).min(Decimal::ONE_HUNDRED);

    SentimentScore {
        score,
        label: SentimentLabel::from_score(score),
        factors,
        confidence: if missing.is_empty() {
            Confidence::Normal
        } else {
            Confidence::Low
        },
        missing,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_funding_bands() {
        assert_eq!(funding_score(Decimal::new(5, 2)), Decimal::from(-80));
        assert_eq!(funding_score(Decimal::new(2, 2)), Decimal::from(-40));
        assert_eq!(funding_score(Decimal::new(1, 2)), Decimal::from(10));
        assert_eq!(funding_score(Decimal::new(-15, 3)), Decimal::from(60));
        // The deeper band must win over the shallower one
        assert_eq!(funding_score(Decimal::new(-5, 2)), Decimal::from(90));
    }

    #[test]
    fn test_fear_greed_bands() {
        assert_eq!(fear_greed_score(10), Decimal::from(80));
        assert_eq!(fear_greed_score(20), Decimal::from(40));
        assert_eq!(fear_greed_score(50), Decimal::ZERO);
        assert_eq!(fear_greed_score(61), Decimal::from(-40));
        assert_eq!(fear_greed_score(81), Decimal::from(-80));
    }

    #[test]
    fn test_smart_money_bands() {
        assert_eq!(smart_money_score(usd_m(60)), Decimal::from(100));
        assert_eq!(smart_money_score(usd_m(20)), Decimal::from(75));
        assert_eq!(smart_money_score(Decimal::ONE), Decimal::from(25));
        assert_eq!(smart_money_score(Decimal::ZERO), Decimal::ZERO);
        assert_eq!(smart_money_score(usd_m(-5)), Decimal::from(-25));
        assert_eq!(smart_money_score(usd_m(-20)), Decimal::from(-75));
        assert_eq!(smart_money_score(usd_m(-60)), Decimal::from(-100));
    }

    #[test]
    fn test_composite_strong_bullish() {
        let s = composite_sentiment(&SentimentInputs {
            smart_money_flow_usd: Some(usd_m(80)),
            btc_funding_pct: Some(Decimal::new(-3, 2)),
            chain_stable_flow_usd: Some(usd_m(30)),
            fear_greed: Some(15),
        });
        // 100*0.4 + 90*0.3 + 100*0.2 + 80*0.1
        assert_eq!(s.score, Decimal::from(95));
        assert_eq!(s.label, SentimentLabel::StrongBullish);
        assert_eq!(s.confidence, Confidence::Normal);
        assert_eq!(s.factors.len(), 4);
    }

    #[test]
    fn test_composite_bearish() {
        let s = composite_sentiment(&SentimentInputs {
            smart_money_flow_usd: Some(usd_m(-20)),
            btc_funding_pct: Some(Decimal::new(5, 2)),
            chain_stable_flow_usd: Some(usd_m(-1)),
            fear_greed: Some(90),
        });
        // -75*0.4 - 80*0.3 - 50*0.2 - 80*0.1 = -72
        assert_eq!(s.score, Decimal::from(-72));
        assert_eq!(s.label, SentimentLabel::StrongBearish);
    }

    #[test]
    fn test_missing_inputs_are_neutral_and_flagged() {
        let s = composite_sentiment(&SentimentInputs {
            fear_greed: Some(50),
            ..SentimentInputs::default()
        });
        assert!(s.score.is_zero());
        assert_eq!(s.label, SentimentLabel::Neutral);
        assert_eq!(s.confidence, Confidence::Low);
        assert_eq!(s.missing, vec!["smart_money_flow", "funding_structure", "chain_stable_flow"]);
    }
}
