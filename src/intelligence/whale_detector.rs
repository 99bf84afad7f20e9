use std::collections::HashMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::taxonomy::Taxonomy;
use crate::models::{AccumulationCandidate, FlowCategory, RawPairSnapshot};

/// Accumulation gates. All must hold for a pair to qualify.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WhaleGates {
    /// Exclusive.
    pub min_age_days: Decimal,
    /// Exclusive.
    pub min_liquidity_usd: Decimal,
    /// Exclusive.
    pub min_avg_ticket_usd: Decimal,
    /// Net-buy ratio must be above this...
    pub min_buy_ratio_pct: Decimal,
    /// ...and at most this.
    pub max_buy_ratio_pct: Decimal,
    /// 24h price change must lie strictly between these two.
    pub min_price_change_pct: Decimal,
    pub max_price_change_pct: Decimal,
    pub max_candidates: usize,
}

impl Default for WhaleGates {
    fn default() -> Self {
        Self {
            min_age_days: Decimal::from(60),
            min_liquidity_usd: Decimal::from(250_000),
            min_avg_ticket_usd: Decimal::ONE_HUNDRED,
            min_buy_ratio_pct: Decimal::from(50),
            max_buy_ratio_pct: Decimal::from(85),
            min_price_change_pct: Decimal::from(-5),
            max_price_change_pct: Decimal::from(10),
            max_candidates: 5,
        }
    }
}

/// First gate a pair failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateFailure {
    TooYoung,
    Illiquid,
    NoTrades,
    SmallTickets,
    /// Buy ratio at or below the floor: sellers dominate.
    NotNetBuying,
    /// Buy ratio above the ceiling: a pump, not quiet accumulation.
    PumpPattern,
    PriceOutOfRange,
}

impl fmt::Display for GateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GateFailure::TooYoung => "too_young",
            GateFailure::Illiquid => "illiquid",
            GateFailure::NoTrades => "no_trades",
            GateFailure::SmallTickets => "small_tickets",
            GateFailure::NotNetBuying => "not_net_buying",
            GateFailure::PumpPattern => "pump_pattern",
            GateFailure::PriceOutOfRange => "price_out_of_range",
        };
        f.write_str(s)
    }
}

/// Run one pair through every gate.
pub fn evaluate_pair(
    pair: &RawPairSnapshot,
    gates: &WhaleGates,
) -> Result<AccumulationCandidate, GateFailure> {
    let age_days = pair.age_days();
    if age_days <= gates.min_age_days {
        return Err(GateFailure::TooYoung);
    }

    if pair.liquidity_usd <= gates.min_liquidity_usd {
        return Err(GateFailure::Illiquid);
    }

    let total_txns = pair.total_txns();
    if total_txns == 0 {
        return Err(GateFailure::NoTrades);
    }

    let avg_ticket_usd = pair.volume_24h_usd / Decimal::from(total_txns);
    if avg_ticket_usd <= gates.min_avg_ticket_usd {
        return Err(GateFailure::SmallTickets);
    }

    let net_buy_ratio_pct =
        Decimal::from(pair.buys_24h) / Decimal::from(total_txns) * Decimal::ONE_HUNDRED;
    if net_buy_ratio_pct <= gates.min_buy_ratio_pct {
        return Err(GateFailure::NotNetBuying);
    }
    if net_buy_ratio_pct > gates.max_buy_ratio_pct {
        return Err(GateFailure::PumpPattern);
    }

    let change = pair.price_change.h24;
    if change <= gates.min_price_change_pct || change >= gates.max_price_change_pct {
        return Err(GateFailure::PriceOutOfRange);
    }

    let whale_score = avg_ticket_usd / Decimal::from(50) + pair.liquidity_usd / Decimal::from(1_000_000);

    Ok(AccumulationCandidate {
        pair: pair.clone(),
        age_days,
        avg_ticket_usd,
        net_buy_ratio_pct,
        whale_score,
    })
}

/// Scan screened pairs for quiet accumulation in altcoins.
///
/// Only pairs whose base token is an altcoin are considered. When several
/// pools of the same token qualify, the highest-scoring one is kept. Output
/// is sorted by whale score, highest first, and truncated.
pub fn detect_accumulation(
    pairs: &[&RawPairSnapshot],
    taxonomy: &Taxonomy,
    gates: &WhaleGates,
) -> Vec<AccumulationCandidate> {
    let mut best: HashMap<String, AccumulationCandidate> = HashMap::new();

    for pair in pairs {
        if taxonomy.classify(&pair.base_symbol) != FlowCategory::Altcoin {
            continue;
        }

        match evaluate_pair(pair, gates) {
            Ok(candidate) => {
                let keep = best
                    .get(&pair.base_symbol)
                    .map_or(true, |existing| candidate.whale_score > existing.whale_score);
                if keep {
                    best.insert(pair.base_symbol.clone(), candidate);
                }
            }
            Err(reason) => {
                tracing::trace!(
                    symbol = %pair.base_symbol,
                    pair = %pair.pair_address,
                    %reason,
                    "Pair rejected by accumulation gates"
                );
            }
        }
    }

    let mut candidates: Vec<AccumulationCandidate> = best.into_values().collect();
    candidates.sort_by(|a, b| {
        b.whale_score
            .cmp(&a.whale_score)
            .then_with(|| a.pair.base_symbol.cmp(&b.pair.base_symbol))
    });
    candidates.truncate(gates.max_candidates);
    candidates
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intelligence::taxonomy::bundled;
    use crate::models::PriceChange;

    /// The canonical accumulating pair: PEPE/USDT, $500k liquidity, $1M volume,
    /// 600 buys / 400 sells, 90 days old, +2% on the day.
    fn pepe() -> RawPairSnapshot {
        RawPairSnapshot {
            chain_id: "ethereum".into(),
            pair_address: "0xpepe".into(),
            base_symbol: "PEPE".into(),
            quote_symbol: "USDT".into(),
            liquidity_usd: Decimal::from(500_000),
            volume_24h_usd: Decimal::from(1_000_000),
            volume_1h_usd: Decimal::from(40_000),
            price_usd: Decimal::new(12, 6),
            price_change: PriceChange {
                m5: Decimal::ZERO,
                h1: Decimal::ZERO,
                h24: Decimal::from(2),
            },
            buys_24h: 600,
            sells_24h: 400,
            pair_age_hours: Decimal::from(90 * 24),
            pair_url: String::new(),
        }
    }

    #[test]
    fn test_scenario_pepe_accepted() {
        let c = evaluate_pair(&pepe(), &WhaleGates::default()).unwrap();
        assert_eq!(c.avg_ticket_usd, Decimal::from(1_000));
        assert_eq!(c.net_buy_ratio_pct, Decimal::from(60));
        assert_eq!(c.age_days, Decimal::from(90));
        // 1000/50 + 500k/1M
        assert_eq!(c.whale_score, Decimal::new(205, 1));
    }

    #[test]
    fn test_age_boundary() {
        let gates = WhaleGates::default();
        let mut p = pepe();
        p.pair_age_hours = Decimal::from(60 * 24);
        assert_eq!(evaluate_pair(&p, &gates).unwrap_err(), GateFailure::TooYoung);
        p.pair_age_hours = Decimal::from(60 * 24 + 1);
        assert!(evaluate_pair(&p, &gates).is_ok());
    }

    #[test]
    fn test_liquidity_boundary() {
        let gates = WhaleGates::default();
        let mut p = pepe();
        p.liquidity_usd = Decimal::from(250_000);
        assert_eq!(evaluate_pair(&p, &gates).unwrap_err(), GateFailure::Illiquid);
        p.liquidity_usd = Decimal::from(250_001);
        assert!(evaluate_pair(&p, &gates).is_ok());
    }

    #[test]
    fn test_avg_ticket_boundary() {
        let gates = WhaleGates::default();
        let mut p = pepe();
        p.volume_24h_usd = Decimal::from(100_000); // exactly $100 per trade
        assert_eq!(evaluate_pair(&p, &gates).unwrap_err(), GateFailure::SmallTickets);
        p.volume_24h_usd = Decimal::from(100_001);
        assert!(evaluate_pair(&p, &gates).is_ok());
    }

    #[test]
    fn test_buy_ratio_boundaries() {
        let gates = WhaleGates::default();
        let mut p = pepe();

        p.buys_24h = 500;
        p.sells_24h = 500; // exactly 50%
        assert_eq!(evaluate_pair(&p, &gates).unwrap_err(), GateFailure::NotNetBuying);

        p.buys_24h = 501;
        p.sells_24h = 499;
        assert!(evaluate_pair(&p, &gates).is_ok());

        p.buys_24h = 850;
        p.sells_24h = 150; // exactly 85% is still accumulation
        assert!(evaluate_pair(&p, &gates).is_ok());

        p.buys_24h = 851;
        p.sells_24h = 149;
        assert_eq!(evaluate_pair(&p, &gates).unwrap_err(), GateFailure::PumpPattern);
    }

    #[test]
    fn test_price_change_boundaries() {
        let gates = WhaleGates::default();
        let mut p = pepe();

        p.price_change.h24 = Decimal::from(-5);
        assert_eq!(evaluate_pair(&p, &gates).unwrap_err(), GateFailure::PriceOutOfRange);
        p.price_change.h24 = Decimal::new(-499, 2);
        assert!(evaluate_pair(&p, &gates).is_ok());

        p.price_change.h24 = Decimal::from(10);
        assert_eq!(evaluate_pair(&p, &gates).unwrap_err(), GateFailure::PriceOutOfRange);
        p.price_change.h24 = Decimal::new(999, 2);
        assert!(evaluate_pair(&p, &gates).is_ok());
    }

    #[test]
    fn test_no_trades_rejected() {
        let mut p = pepe();
        p.buys_24h = 0;
        p.sells_24h = 0;
        assert_eq!(
            evaluate_pair(&p, &WhaleGates::default()).unwrap_err(),
            GateFailure::NoTrades
        );
    }

    #[test]
    fn test_detect_skips_non_altcoins_and_dedupes() {
        let t = bundled();
        let mut eth = pepe();
        eth.base_symbol = "WETH".into();

        let mut deeper_pepe = pepe();
        deeper_pepe.pair_address = "0xpepe2".into();
        deeper_pepe.liquidity_usd = Decimal::from(3_000_000);

        let pairs = vec![pepe(), eth, deeper_pepe];
        let refs: Vec<&RawPairSnapshot> = pairs.iter().collect();
        let found = detect_accumulation(&refs, &t, &WhaleGates::default());

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].pair.pair_address, "0xpepe2");
    }

    #[test]
    fn test_detect_top_five_sorted() {
        let t = bundled();
        let pairs: Vec<RawPairSnapshot> = (0..8)
            .map(|i| {
                let mut p = pepe();
                p.base_symbol = format!("ALT{i}");
                p.pair_address = format!("0x{i}");
                p.liquidity_usd = Decimal::from(300_000 + i * 100_000);
                p
            })
            .collect();
        let refs: Vec<&RawPairSnapshot> = pairs.iter().collect();
        let gates = WhaleGates::default();
        let found = detect_accumulation(&refs, &t, &gates);

        assert_eq!(found.len(), 5);
        assert_eq!(found[0].symbol(), "ALT7");
        assert!(found.windows(2).all(|w| w[0].whale_score >= w[1].whale_score));

        // No emitted candidate violates a gate
        for c in &found {
            assert!(c.age_days > gates.min_age_days);
            assert!(c.pair.liquidity_usd > gates.min_liquidity_usd);
            assert!(c.avg_ticket_usd > gates.min_avg_ticket_usd);
            assert!(c.net_buy_ratio_pct > gates.min_buy_ratio_pct);
            assert!(c.net_buy_ratio_pct <= gates.max_buy_ratio_pct);
            assert!(c.pair.price_change.h24 > gates.min_price_change_pct);
            assert!(c.pair.price_change.h24 < gates.max_price_change_pct);
        }
    }
}
