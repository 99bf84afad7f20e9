use std::collections::HashSet;

use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::position_sizer::size_position;
use super::treasury::TreasuryState;
use crate::intelligence::taxonomy::Taxonomy;
use crate::models::{
    Direction, MarketIndicators, Opportunity, OpportunityKind, PaperPosition, PositionStatus,
};

pub const MIN_OPEN_SCORE: Decimal = Decimal::from_parts(80, 0, 0, false, 0);
pub const TAKE_PROFIT_PCT: Decimal = Decimal::from_parts(15, 0, 0, false, 0);
pub const STOP_LOSS_PCT: Decimal = Decimal::from_parts(10, 0, 0, true, 0);

/// Positions touched during one trading pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradingActivity {
    pub opened: Vec<Uuid>,
    pub closed: Vec<Uuid>,
    /// Open positions with no price this cycle; left at their last mark.
    pub unpriced: Vec<String>,
}

/// Signed PnL percent of a position marked at `price`.
pub fn pnl_pct(direction: Direction, entry: Decimal, price: Decimal) -> Decimal {
    if entry.is_zero() {
        return Decimal::ZERO;
    }
    ((price - entry) / entry * Decimal::ONE_HUNDRED * direction.sign()).round_dp(4)
}

/// Exit status for a mark, if any. Thresholds are strict.
pub fn exit_status(pnl_pct: Decimal) -> Option<PositionStatus> {
    if pnl_pct > TAKE_PROFIT_PCT {
        Some(PositionStatus::ClosedTp)
    } else if pnl_pct < STOP_LOSS_PCT {
        Some(PositionStatus::ClosedSl)
    } else {
        None
    }
}

/// Revalue open positions, closing the ones that crossed TP/SL. Every close
/// is settled into the treasury.
pub fn mark_to_market(
    positions: &mut [PaperPosition],
    indicators: &MarketIndicators,
    treasury: &mut TreasuryState,
    now: DateTime<Utc>,
    activity: &mut TradingActivity,
) {
    for pos in positions.iter_mut().filter(|p| p.is_open()) {
        let Some(price) = indicators.price(&pos.symbol) else {
            tracing::debug!(symbol = %pos.symbol, "No price for open position");
            activity.unpriced.push(pos.symbol.clone());
            continue;
        };

        pos.current_price = price;
        pos.pnl_pct = pnl_pct(pos.direction, pos.entry_price, price);
        pos.pnl_usd = (pos.size_usd * pos.pnl_pct / Decimal::ONE_HUNDRED).round_dp(2);

        let Some(status) = exit_status(pos.pnl_pct) else {
            continue;
        };

        pos.status = status;
        pos.exit_price = Some(price);
        pos.exit_time = Some(now);
        treasury.settle(pos.pnl_usd, pos.pnl_pct, now);
        activity.closed.push(pos.id);

        let label = match status {
            PositionStatus::ClosedTp => "take_profit",
            _ => "stop_loss",
        };
        counter!("paper_positions_closed_total", "reason" => label).increment(1);
        tracing::info!(
            id = %pos.id,
            symbol = %pos.symbol,
            direction = %pos.direction,
            pnl_pct = %pos.pnl_pct,
            pnl_usd = %pos.pnl_usd,
            reason = label,
            "Paper position closed"
        );
    }

    treasury.unrealized_pnl = positions
        .iter()
        .filter(|p| p.is_open())
        .map(|p| p.pnl_usd)
        .sum();
}

/// Open simulated positions for qualifying chain opportunities.
pub fn open_positions(
    positions: &mut Vec<PaperPosition>,
    opportunities: &[Opportunity],
    taxonomy: &Taxonomy,
    indicators: &MarketIndicators,
    treasury: &TreasuryState,
    now: DateTime<Utc>,
    activity: &mut TradingActivity,
) {
    let mut held: HashSet<String> = positions
        .iter()
        .filter(|p| p.is_open())
        .map(|p| p.symbol.clone())
        .collect();
    let stats = treasury.win_stats();

    for opp in opportunities {
        if opp.kind != OpportunityKind::Chain || opp.score < MIN_OPEN_SCORE {
            continue;
        }
        let Some(symbol) = taxonomy.tradable_symbol(&opp.asset_id) else {
            tracing::debug!(chain = %opp.asset_id, "Chain has no tradable symbol");
            continue;
        };
        if held.contains(symbol) {
            continue;
        }
        let Some(price) = indicators.price(symbol) else {
            tracing::debug!(symbol, "No spot price, not opening");
            continue;
        };

        let sizing = size_position(treasury.capital, &stats, opp.score);
        if sizing.size_usd <= Decimal::ZERO {
            tracing::warn!(symbol, capital = %treasury.capital, "No capital to size position");
            continue;
        }

        let pos = PaperPosition {
            id: Uuid::new_v4(),
            symbol: symbol.to_string(),
            source_asset: opp.asset_id.clone(),
            direction: opp.direction,
            entry_price: price,
            entry_time: now,
            size_usd: sizing.size_usd,
            current_price: price,
            status: PositionStatus::Open,
            pnl_pct: Decimal::ZERO,
            pnl_usd: Decimal::ZERO,
            exit_price: None,
            exit_time: None,
            score: opp.score,
            tags: opp.tags.clone(),
        };

        counter!("paper_positions_opened_total").increment(1);
        tracing::info!(
            id = %pos.id,
            symbol,
            direction = %pos.direction,
            price = %price,
            size_usd = %pos.size_usd,
            kelly = %sizing.kelly_fraction,
            "Paper position opened"
        );

        held.insert(pos.symbol.clone());
        activity.opened.push(pos.id);
        positions.push(pos);
    }
}

/// One trading pass: mark existing positions first, then open new ones.
pub fn run_paper_trading(
    positions: &mut Vec<PaperPosition>,
    opportunities: &[Opportunity],
    taxonomy: &Taxonomy,
    indicators: &MarketIndicators,
    treasury: &mut TreasuryState,
    now: DateTime<Utc>,
) -> TradingActivity {
    let mut activity = TradingActivity::default();

    mark_to_market(positions, indicators, treasury, now, &mut activity);
    open_positions(positions, opportunities, taxonomy, indicators, treasury, now, &mut activity);

    let open = positions.iter().filter(|p| p.is_open()).count();
    gauge!("open_positions").set(open as f64);
    gauge!("treasury_capital_usd").set(treasury.capital.to_f64().unwrap_or(0.0));

    activity
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intelligence::taxonomy::bundled;
    use crate::models::{ReasonTag, SupportingMetrics};

    fn chain_opp(chain: &str, direction: Direction, score: i64) -> Opportunity {
        Opportunity {
            asset_id: chain.into(),
            kind: OpportunityKind::Chain,
            direction,
            score: Decimal::from(score),
            tags: vec![ReasonTag::CapitalInflow],
            metrics: SupportingMetrics::default(),
            consensus: None,
        }
    }

    fn prices(pairs: &[(&str, i64)]) -> MarketIndicators {
        MarketIndicators {
            spot_prices: pairs
                .iter()
                .map(|(s, p)| (s.to_string(), Decimal::from(*p)))
                .collect(),
            ..MarketIndicators::default()
        }
    }

    #[test]
    fn test_pnl_sign_follows_direction() {
        let entry = Decimal::from(100);
        assert_eq!(pnl_pct(Direction::Long, entry, Decimal::from(110)), Decimal::from(10));
        assert_eq!(pnl_pct(Direction::Short, entry, Decimal::from(110)), Decimal::from(-10));
        assert_eq!(pnl_pct(Direction::Short, entry, Decimal::from(80)), Decimal::from(20));
    }

    #[test]
    fn test_exit_thresholds_are_strict() {
        assert_eq!(exit_status(Decimal::from(15)), None);
        assert_eq!(exit_status(Decimal::new(1501, 2)), Some(PositionStatus::ClosedTp));
        assert_eq!(exit_status(Decimal::from(-10)), None);
        assert_eq!(exit_status(Decimal::new(-1001, 2)), Some(PositionStatus::ClosedSl));
    }

    #[test]
    fn test_opens_only_qualifying_chain_opportunities() {
        let t = bundled();
        let mut treasury = TreasuryState::new(Decimal::from(10_000));
        let mut positions = Vec::new();
        let mut exchange = chain_opp("binance-cex", Direction::Long, 90);
        exchange.kind = OpportunityKind::Exchange;

        let opps = vec![
            chain_opp("Solana", Direction::Long, 90),
            chain_opp("Ethereum", Direction::Long, 79),
            chain_opp("Unknownchain", Direction::Long, 95),
            exchange,
        ];
        let activity = run_paper_trading(
            &mut positions,
            &opps,
            &t,
            &prices(&[("SOL", 150), ("ETH", 3_000)]),
            &mut treasury,
            Utc::now(),
        );

        assert_eq!(activity.opened.len(), 1);
        assert_eq!(positions.len(), 1);
        let pos = &positions[0];
        assert_eq!(pos.symbol, "SOL");
        assert_eq!(pos.entry_price, Decimal::from(150));
        // 10_000 × 0.7 × 0.1 (prior Kelly) × 0.9
        assert_eq!(pos.size_usd, Decimal::from(630));
    }

    #[test]
    fn test_no_duplicate_symbol() {
        let t = bundled();
        let mut treasury = TreasuryState::new(Decimal::from(10_000));
        let mut positions = Vec::new();
        let opps = vec![chain_opp("Solana", Direction::Long, 90)];
        let ind = prices(&[("SOL", 150)]);

        run_paper_trading(&mut positions, &opps, &t, &ind, &mut treasury, Utc::now());
        let second = run_paper_trading(&mut positions, &opps, &t, &ind, &mut treasury, Utc::now());

        assert!(second.opened.is_empty());
        assert_eq!(positions.len(), 1);
    }

    #[test]
    fn test_take_profit_settles_treasury() {
        let t = bundled();
        let mut treasury = TreasuryState::new(Decimal::from(10_000));
        let mut positions = Vec::new();
        let opps = vec![chain_opp("Solana", Direction::Long, 100)];

        run_paper_trading(&mut positions, &opps, &t, &prices(&[("SOL", 100)]), &mut treasury, Utc::now());
        assert_eq!(positions[0].size_usd, Decimal::from(700));

        let activity = run_paper_trading(&mut positions, &[], &t, &prices(&[("SOL", 120)]), &mut treasury, Utc::now());

        let pos = &positions[0];
        assert_eq!(activity.closed, vec![pos.id]);
        assert_eq!(pos.status, PositionStatus::ClosedTp);
        assert_eq!(pos.pnl_pct, Decimal::from(20));
        assert_eq!(pos.pnl_usd, Decimal::from(140));
        assert_eq!(pos.exit_price, Some(Decimal::from(120)));
        assert_eq!(treasury.capital, Decimal::from(10_014));
        assert_eq!(treasury.withdrawable, Decimal::from(98));
        assert!(treasury.unrealized_pnl.is_zero());
    }

    #[test]
    fn test_short_stop_loss_on_rally() {
        let t = bundled();
        let mut treasury = TreasuryState::new(Decimal::from(10_000));
        let mut positions = Vec::new();
        let opps = vec![chain_opp("Ethereum", Direction::Short, 100)];

        run_paper_trading(&mut positions, &opps, &t, &prices(&[("ETH", 1_000)]), &mut treasury, Utc::now());
        // +5% rally: short is down 5%, still open
        run_paper_trading(&mut positions, &[], &t, &prices(&[("ETH", 1_050)]), &mut treasury, Utc::now());
        assert!(positions[0].is_open());
        assert_eq!(treasury.unrealized_pnl, Decimal::from(-35));

        run_paper_trading(&mut positions, &[], &t, &prices(&[("ETH", 1_120)]), &mut treasury, Utc::now());
        assert_eq!(positions[0].status, PositionStatus::ClosedSl);
        assert_eq!(positions[0].pnl_usd, Decimal::from(-84));
        assert_eq!(treasury.capital, Decimal::from(9_916));
        assert_eq!(treasury.losses, 1);
    }

    #[test]
    fn test_unpriced_position_keeps_last_mark() {
        let t = bundled();
        let mut treasury = TreasuryState::new(Decimal::from(10_000));
        let mut positions = Vec::new();
        let opps = vec![chain_opp("Solana", Direction::Long, 100)];

        run_paper_trading(&mut positions, &opps, &t, &prices(&[("SOL", 100)]), &mut treasury, Utc::now());
        let activity = run_paper_trading(&mut positions, &[], &t, &prices(&[]), &mut treasury, Utc::now());

        assert_eq!(activity.unpriced, vec!["SOL".to_string()]);
        assert!(positions[0].is_open());
        assert_eq!(positions[0].current_price, Decimal::from(100));
    }
}
