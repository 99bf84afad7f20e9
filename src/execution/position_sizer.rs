use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::Confidence;

pub const MIN_KELLY: Decimal = Decimal::from_parts(2, 0, 0, false, 2); // 0.02
pub const MAX_KELLY: Decimal = Decimal::from_parts(20, 0, 0, false, 2); // 0.20
/// Used when the payoff ratio is undefined (no wins or no losses yet).
const FALLBACK_KELLY: Decimal = Decimal::from_parts(5, 0, 0, false, 2);
/// Share of capital the sizer may put at risk; the rest stays as buffer.
const TRADEABLE_SHARE: Decimal = Decimal::from_parts(7, 0, 0, false, 1);
/// Closed trades needed before realized stats replace the priors.
pub const MIN_SAMPLE: u32 = 5;

/// Realized trading statistics fed into Kelly. Percentages are positive
/// magnitudes (avg loss of 3% is `3`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinStats {
    /// 0..1.
    pub win_rate: Decimal,
    pub avg_win_pct: Decimal,
    pub avg_loss_pct: Decimal,
    pub confidence: Confidence,
}

impl WinStats {
    /// Priors used until enough trades have closed.
    pub fn prior() -> Self {
        Self {
            win_rate: Decimal::new(5, 1),
            avg_win_pct: Decimal::from(5),
            avg_loss_pct: Decimal::from(3),
            confidence: Confidence::Low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizingDecision {
    pub size_usd: Decimal,
    pub kelly_fraction: Decimal,
    pub stats_confidence: Confidence,
}

/// Half-Kelly: f* = (b·p − q)/b with b = avgWin/avgLoss, halved and clamped
/// to [0.02, 0.20].
pub fn kelly_fraction(win_rate: Decimal, avg_win_pct: Decimal, avg_loss_pct: Decimal) -> Decimal {
    if avg_win_pct <= Decimal::ZERO || avg_loss_pct <= Decimal::ZERO {
        return FALLBACK_KELLY.clamp(MIN_KELLY, MAX_KELLY);
    }

    let p = win_rate.clamp(Decimal::ZERO, Decimal::ONE);
    let q = Decimal::ONE - p;
    let b = avg_win_pct / avg_loss_pct;

    let full = (b * p - q) / b;
    let half = (full * Decimal::new(5, 1)).round_dp(4);

    half.clamp(MIN_KELLY, MAX_KELLY)
}

/// Tradeable capital × f* × confidence/100, where confidence is the
/// opportunity score (0..100).
pub fn position_size(capital: Decimal, kelly: Decimal, confidence: Decimal) -> Decimal {
    let confidence = confidence.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);
    let size = capital.max(Decimal::ZERO) * TRADEABLE_SHARE * kelly * confidence
        / Decimal::ONE_HUNDRED;
    size.round_dp(2)
}

pub fn size_position(capital: Decimal, stats: &WinStats, confidence: Decimal) -> SizingDecision {
    let kelly = kelly_fraction(stats.win_rate, stats.avg_win_pct, stats.avg_loss_pct);
    SizingDecision {
        size_usd: position_size(capital, kelly, confidence),
        kelly_fraction: kelly,
        stats_confidence: stats.confidence,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn d(m: i64, s: u32) -> Decimal {
        Decimal::new(m, s)
    }

    #[test]
    fn test_kelly_with_priors() {
        // b = 5/3, p = 0.5: f* = 0.2, half = 0.1
        let prior = WinStats::prior();
        let k = kelly_fraction(prior.win_rate, prior.avg_win_pct, prior.avg_loss_pct);
        assert_eq!(k, d(1, 1));
    }

    #[test]
    fn test_kelly_exact() {
        // b = 2, p = 0.5: f* = 0.25, half = 0.125
        assert_eq!(kelly_fraction(d(5, 1), Decimal::from(6), Decimal::from(3)), d(125, 3));
    }

    #[test]
    fn test_kelly_clamped() {
        // Losing edge clamps to the floor
        assert_eq!(kelly_fraction(d(1, 1), Decimal::ONE, Decimal::from(10)), MIN_KELLY);
        // Overwhelming edge clamps to the ceiling
        assert_eq!(kelly_fraction(d(99, 2), Decimal::from(50), Decimal::ONE), MAX_KELLY);
    }

    #[test]
    fn test_kelly_extreme_inputs_stay_in_range() {
        let rates = [d(-5, 0), Decimal::ZERO, d(3, 1), Decimal::ONE, Decimal::from(7)];
        let payoffs = [d(-10, 0), Decimal::ZERO, d(1, 3), Decimal::ONE, Decimal::from(1_000_000)];
        for &p in &rates {
            for &win in &payoffs {
                for &loss in &payoffs {
                    let k = kelly_fraction(p, win, loss);
                    assert!(k >= MIN_KELLY && k <= MAX_KELLY, "p={p} win={win} loss={loss} k={k}");
                }
            }
        }
    }

    #[test]
    fn test_degenerate_payoff_falls_back() {
        assert_eq!(kelly_fraction(d(6, 1), Decimal::from(4), Decimal::ZERO), d(5, 2));
        assert_eq!(kelly_fraction(d(6, 1), Decimal::ZERO, Decimal::from(4)), d(5, 2));
    }

    #[test]
    fn test_position_size() {
        // 10_000 × 0.7 × 0.1 × 0.9
        assert_eq!(position_size(Decimal::from(10_000), d(1, 1), Decimal::from(90)), Decimal::from(630));
        assert!(position_size(Decimal::from(-5), d(1, 1), Decimal::from(90)).is_zero());
    }

    #[test]
    fn test_size_position_flags_prior_stats() {
        let decision = size_position(Decimal::from(10_000), &WinStats::prior(), Decimal::from(100));
        assert_eq!(decision.size_usd, Decimal::from(700));
        assert!(decision.stats_confidence.is_low());
    }
}
