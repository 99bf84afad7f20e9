use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::taxonomy::Taxonomy;
use crate::models::{
    CategoryFlowStat, FlowBreakdown, FlowCategory, MarketBreadth, RawPairSnapshot, RotationPhase,
};

const MAX_TOP_TOKENS: usize = 5;

/// Pair screening thresholds. Empirical values, kept configurable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WashTradeFilter {
    pub min_liquidity_usd: Decimal,
    /// 24h volume / liquidity above this is treated as wash trading.
    pub max_turnover: Decimal,
    /// Volume above this with a near-flat price is treated as wash trading.
    pub stale_volume_usd: Decimal,
    pub stale_price_change_pct: Decimal,
}

impl Default for WashTradeFilter {
    fn default() -> Self {
        Self {
            min_liquidity_usd: Decimal::from(10_000),
            max_turnover: Decimal::ONE_HUNDRED,
            stale_volume_usd: Decimal::from(50_000),
            stale_price_change_pct: Decimal::new(1, 2), // 0.01%
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Accepted,
    BelowLiquidity,
    WashTrade,
}

/// Decide whether a pair's volume is usable.
pub fn screen_pair(pair: &RawPairSnapshot, filter: &WashTradeFilter) -> Screen {
    // An unpriced pool carries no usable liquidity either
    if pair.liquidity_usd < filter.min_liquidity_usd || pair.price_usd <= Decimal::ZERO {
        return Screen::BelowLiquidity;
    }

    if pair.turnover().is_some_and(|t| t > filter.max_turnover) {
        return Screen::WashTrade;
    }

    if pair.volume_24h_usd > filter.stale_volume_usd
        && pair.price_change.h24.abs() < filter.stale_price_change_pct
    {
        return Screen::WashTrade;
    }

    Screen::Accepted
}

/// Pairs that survive screening, in input order.
pub fn screen_pairs<'a>(
    pairs: &'a [RawPairSnapshot],
    filter: &WashTradeFilter,
) -> Vec<&'a RawPairSnapshot> {
    pairs
        .iter()
        .filter(|p| screen_pair(p, filter) == Screen::Accepted)
        .collect()
}

#[derive(Default)]
struct Accumulator {
    volume: Decimal,
    liquidity: Decimal,
    pair_count: Decimal,
    net_flow: i64,
    token_volume: HashMap<String, Decimal>,
}

impl Accumulator {
    fn add(&mut self, symbol: &str, volume: Decimal, liquidity: Decimal, half: Decimal, net: i64) {
        self.volume += volume;
        self.liquidity += liquidity;
        self.pair_count += half;
        self.net_flow += net;
        *self.token_volume.entry(symbol.to_string()).or_default() += volume;
    }

    fn top_tokens(&self) -> Vec<String> {
        let mut tokens: Vec<(&String, &Decimal)> = self.token_volume.iter().collect();
        tokens.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        tokens
            .into_iter()
            .take(MAX_TOP_TOKENS)
            .map(|(s, _)| s.clone())
            .collect()
    }
}

fn pct(part: Decimal, total: Decimal) -> Decimal {
    if total.is_zero() {
        Decimal::ZERO
    } else {
        part / total * Decimal::ONE_HUNDRED
    }
}

/// Split one scan target's 24h volume and liquidity into token categories.
///
/// Each surviving pair contributes half its volume, liquidity and pair count
/// to its base token's category and half to its quote token's. Net buy
/// pressure (buys − sells) is credited to the base category and debited from
/// the quote category. Percentages are left unrounded so they sum to 100.
///
/// Pure: the same input always yields the same breakdown.
pub fn classify_flows(
    target: &str,
    pairs: &[RawPairSnapshot],
    taxonomy: &Taxonomy,
    filter: &WashTradeFilter,
) -> FlowBreakdown {
    let half = Decimal::new(5, 1);
    let mut acc: [Accumulator; 4] = Default::default();
    let mut below_liquidity = 0;
    let mut wash_traded = 0;
    let mut breadth = MarketBreadth::default();

    for pair in pairs {
        match screen_pair(pair, filter) {
            Screen::BelowLiquidity => {
                below_liquidity += 1;
                continue;
            }
            Screen::WashTrade => {
                wash_traded += 1;
                continue;
            }
            Screen::Accepted => {}
        }

        let volume = pair.volume_24h_usd * half;
        let liquidity = pair.liquidity_usd * half;
        let net = pair.net_txns();

        let base = taxonomy.classify(&pair.base_symbol);
        let quote = taxonomy.classify(&pair.quote_symbol);

        acc[base.index()].add(&pair.base_symbol, volume, liquidity, half, net);
        acc[quote.index()].add(&pair.quote_symbol, volume, liquidity, half, -net);

        match pair.price_change.h24 {
            c if c > Decimal::ZERO => breadth.advancing += 1,
            c if c < Decimal::ZERO => breadth.declining += 1,
            _ => breadth.unchanged += 1,
        }
        breadth.total_buys += pair.buys_24h;
        breadth.total_sells += pair.sells_24h;
    }

    let total_volume: Decimal = acc.iter().map(|a| a.volume).sum();
    let total_liquidity: Decimal = acc.iter().map(|a| a.liquidity).sum();

    let categories: Vec<CategoryFlowStat> = FlowCategory::ALL
        .iter()
        .map(|&category| {
            let a = &acc[category.index()];
            CategoryFlowStat {
                category,
                volume_usd: a.volume,
                volume_pct: pct(a.volume, total_volume),
                liquidity_usd: a.liquidity,
                liquidity_pct: pct(a.liquidity, total_liquidity),
                pair_count: a.pair_count,
                net_flow_count: a.net_flow,
                top_tokens: a.top_tokens(),
            }
        })
        .collect();

    let dominant = if total_volume.is_zero() {
        None
    } else {
        // First maximum wins, so ties resolve in FlowCategory::ALL order
        categories
            .iter()
            .fold(None::<&CategoryFlowStat>, |best, s| match best {
                Some(b) if b.volume_usd >= s.volume_usd => Some(b),
                _ => Some(s),
            })
            .map(|s| s.category)
    };

    let moved = breadth.advancing + breadth.declining;
    breadth.advance_pct = if moved == 0 {
        Decimal::from(50)
    } else {
        pct(Decimal::from(breadth.advancing), Decimal::from(moved))
    };
    breadth.buy_sell_ratio = (breadth.total_sells > 0)
        .then(|| Decimal::from(breadth.total_buys) / Decimal::from(breadth.total_sells));

    let rotation = rotation_phase(&categories, total_volume);

    FlowBreakdown {
        target: target.to_string(),
        total_volume_usd: total_volume,
        total_liquidity_usd: total_liquidity,
        categories,
        dominant,
        pairs_seen: pairs.len(),
        pairs_below_liquidity: below_liquidity,
        pairs_wash_traded: wash_traded,
        breadth,
        rotation,
    }
}

/// Read the capital rotation stage off the category volume shares.
pub fn rotation_phase(categories: &[CategoryFlowStat], total_volume: Decimal) -> RotationPhase {
    if total_volume.is_zero() {
        return RotationPhase::Undetermined;
    }

    let share = |c: FlowCategory| {
        categories
            .iter()
            .find(|s| s.category == c)
            .map(|s| s.volume_pct)
            .unwrap_or(Decimal::ZERO)
    };

    let stable = share(FlowCategory::Stablecoin);
    let native = share(FlowCategory::Native);
    let alt = share(FlowCategory::Altcoin);
    let btc = share(FlowCategory::Btc);

    if stable > Decimal::from(50) {
        RotationPhase::RiskOff
    } else if native > Decimal::from(40) && alt < Decimal::from(30) {
        RotationPhase::NativeLed
    } else if alt > Decimal::from(35) {
        RotationPhase::AltSeason
    } else if btc > Decimal::from(30) {
        RotationPhase::BtcLed
    } else {
        RotationPhase::Balanced
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
