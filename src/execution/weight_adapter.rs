use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{AgentRole, AgentWeights, Direction, PaperPosition, TradeStats};

/// Fixed step applied to momentum/risk-control per run.
pub const LEARNING_RATE: Decimal = Decimal::from_parts(1, 0, 0, false, 1);
const FUNDAMENTALS_STEP: Decimal = Decimal::from_parts(5, 0, 0, false, 2);
const FUNDAMENTALS_CAP: Decimal = Decimal::from_parts(15, 0, 0, false, 1);
const WIN_RATE_BAR_PCT: i64 = 60;
pub const MIN_CLOSED_TRADES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightChange {
    pub agent: AgentRole,
    pub from: Decimal,
    pub to: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AdaptOutcome {
    /// Not enough closed trades to learn from.
    Skipped { closed_trades: usize },
    Updated { changes: Vec<WeightChange> },
}

fn nudge(
    weights: &mut AgentWeights,
    changes: &mut Vec<WeightChange>,
    agent: AgentRole,
    to: Decimal,
) {
    let from = weights.get(agent);
    weights.set(agent, to);
    let to = weights.get(agent);
    if to != from {
        changes.push(WeightChange { agent, from, to });
    }
}

/// Bounded rule-based controller over closed paper trades. When longs lose
/// more often than shorts, momentum is trusted less and risk control more
/// (and the mirror for shorts). A high win rate slowly boosts fundamentals.
pub fn adapt_weights(
    weights: &mut AgentWeights,
    positions: &[PaperPosition],
    now: DateTime<Utc>,
) -> AdaptOutcome {
    let closed: Vec<&PaperPosition> = positions.iter().filter(|p| !p.is_open()).collect();
    if closed.len() < MIN_CLOSED_TRADES {
        tracing::debug!(closed = closed.len(), "Weight adapter skipped: sample too small");
        return AdaptOutcome::Skipped {
            closed_trades: closed.len(),
        };
    }

    let total = Decimal::from(closed.len());
    let wins = closed.iter().filter(|p| p.is_win()).count();
    let losses_by = |dir: Direction| {
        closed
            .iter()
            .filter(|p| p.direction == dir && !p.is_win())
            .count()
    };
    let long_losses = losses_by(Direction::Long);
    let short_losses = losses_by(Direction::Short);
    let win_rate_pct = Decimal::from(wins) / total * Decimal::ONE_HUNDRED;
    let avg_pnl_pct = closed.iter().map(|p| p.pnl_pct).sum::<Decimal>() / total;

    let mut changes = Vec::new();
    let momentum = weights.get(AgentRole::Momentum);
    let risk = weights.get(AgentRole::RiskControl);

    if long_losses > short_losses {
        nudge(weights, &mut changes, AgentRole::Momentum, momentum - LEARNING_RATE);
        nudge(weights, &mut changes, AgentRole::RiskControl, risk + LEARNING_RATE);
    } else if short_losses > long_losses {
        nudge(weights, &mut changes, AgentRole::Momentum, momentum + LEARNING_RATE);
        nudge(weights, &mut changes, AgentRole::RiskControl, risk - LEARNING_RATE);
    }

    let fundamentals = weights.get(AgentRole::Fundamentals);
    if win_rate_pct > Decimal::from(WIN_RATE_BAR_PCT) && fundamentals < FUNDAMENTALS_CAP {
        let to = (fundamentals + FUNDAMENTALS_STEP).min(FUNDAMENTALS_CAP);
        nudge(weights, &mut changes, AgentRole::Fundamentals, to);
    }

    weights.stats = TradeStats {
        total_trades: closed.len(),
        win_rate_pct: win_rate_pct.round_dp(2),
        avg_pnl_pct: avg_pnl_pct.round_dp(4),
        long_losses,
        short_losses,
        updated_at: Some(now),
    };

    tracing::info!(
        closed = closed.len(),
        win_rate = %weights.stats.win_rate_pct,
        long_losses,
        short_losses,
        changed = changes.len(),
        "Agent weights adapted"
    );

    AdaptOutcome::Updated { changes }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
