use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::position_sizer::{WinStats, MIN_SAMPLE};
use crate::models::Confidence;

/// Realized profit split: 10% compounds into capital, 20% goes to the
/// reserve, 70% becomes withdrawable.
const COMPOUND_SHARE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);
const RESERVE_SHARE: Decimal = Decimal::from_parts(20, 0, 0, false, 2);
const WITHDRAW_SHARE: Decimal = Decimal::from_parts(70, 0, 0, false, 2);

/// Simulated treasury. Capital only moves when a paper position closes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreasuryState {
    pub initial_capital: Decimal,
    pub capital: Decimal,
    pub realized_pnl: Decimal,
    /// Mark-to-market of open positions as of the last cycle.
    pub unrealized_pnl: Decimal,
    pub reserve_fund: Decimal,
    pub withdrawable: Decimal,
    pub total_trades: u32,
    pub wins: u32,
    pub losses: u32,
    /// Sum of winning pnl percentages.
    pub gross_win_pct: Decimal,
    /// Sum of losing pnl percentages as a positive magnitude.
    pub gross_loss_pct: Decimal,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreasurySummary {
    pub capital: Decimal,
    pub reserve_fund: Decimal,
    pub withdrawable: Decimal,
    pub realized_pnl: Decimal,
    pub unrealized_pnl: Decimal,
    pub total_value: Decimal,
    pub roi_pct: Decimal,
    pub total_trades: u32,
    pub wins: u32,
    pub losses: u32,
    pub win_rate_pct: Decimal,
}

impl TreasuryState {
    pub fn new(initial_capital: Decimal) -> Self {
        Self {
            initial_capital,
            capital: initial_capital,
            realized_pnl: Decimal::ZERO,
            unrealized_pnl: Decimal::ZERO,
            reserve_fund: Decimal::ZERO,
            withdrawable: Decimal::ZERO,
            total_trades: 0,
            wins: 0,
            losses: 0,
            gross_win_pct: Decimal::ZERO,
            gross_loss_pct: Decimal::ZERO,
            updated_at: None,
        }
    }

    /// Book the realized result of one closed position.
    pub fn settle(&mut self, pnl_usd: Decimal, pnl_pct: Decimal, now: DateTime<Utc>) {
        self.total_trades += 1;
        self.realized_pnl += pnl_usd;

        if pnl_usd > Decimal::ZERO {
            self.wins += 1;
            self.gross_win_pct += pnl_pct.abs();
            self.capital += pnl_usd * COMPOUND_SHARE;
            self.reserve_fund += pnl_usd * RESERVE_SHARE;
            self.withdrawable += pnl_usd * WITHDRAW_SHARE;
        } else {
            self.losses += 1;
            self.gross_loss_pct += pnl_pct.abs();
            self.capital += pnl_usd;
        }
        self.updated_at = Some(now);

        tracing::info!(
            pnl_usd = %pnl_usd,
            capital = %self.capital,
            reserve = %self.reserve_fund,
            withdrawable = %self.withdrawable,
            "Treasury settled"
        );
    }

    /// Win statistics for the sizer. Falls back to priors while the sample
    /// is too small.
    pub fn win_stats(&self) -> WinStats {
        if self.total_trades < MIN_SAMPLE {
            return WinStats::prior();
        }

        let avg = |sum: Decimal, n: u32| {
            if n == 0 {
                Decimal::ZERO
            } else {
                sum / Decimal::from(n)
            }
        };

        WinStats {
            win_rate: Decimal::from(self.wins) / Decimal::from(self.total_trades),
            avg_win_pct: avg(self.gross_win_pct, self.wins),
            avg_loss_pct: avg(self.gross_loss_pct, self.losses),
            confidence: Confidence::Normal,
        }
    }

    pub fn total_value(&self) -> Decimal {
        self.capital + self.reserve_fund + self.withdrawable
    }

    pub fn summary(&self) -> TreasurySummary {
        let total_value = self.total_value();
        let roi_pct = if self.initial_capital.is_zero() {
            Decimal::ZERO
        } else {
            ((total_value - self.initial_capital) / self.initial_capital * Decimal::ONE_HUNDRED)
                .round_dp(2)
        };
        let win_rate_pct = if self.total_trades == 0 {
            Decimal::ZERO
        } else {
            (Decimal::from(self.wins) / Decimal::from(self.total_trades) * Decimal::ONE_HUNDRED)
                .round_dp(2)
        };

        TreasurySummary {
            capital: self.capital,
            reserve_fund: self.reserve_fund,
            withdrawable: self.withdrawable,
            realized_pnl: self.realized_pnl,
            unrealized_pnl: self.unrealized_pnl,
            total_value,
            roi_pct,
            total_trades: self.total_trades,
            wins: self.wins,
            losses: self.losses,
            win_rate_pct,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
