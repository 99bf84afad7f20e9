use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use super::taxonomy::Taxonomy;
use crate::models::{BalanceSnapshot, ExchangeFlow, ReasonTag, TokenFlow};

/// Per-token balance changes smaller than this are noise.
const MIN_TOKEN_FLOW_USD: i64 = 100_000;
const MAX_BREAKDOWN: usize = 10;
const INSUFFICIENT_CONFIDENCE: u8 = 20;

fn usd_m(millions: i64) -> Decimal {
    Decimal::from(millions * 1_000_000)
}

/// Snapshot closest to 24h before `latest`, within three days. Falls back to
/// the one just before `latest`.
fn baseline<'a>(history: &'a [BalanceSnapshot], latest: &BalanceSnapshot) -> &'a BalanceSnapshot {
    let target = latest.date - Duration::hours(24);
    let earlier = &history[..history.len() - 1];

    earlier
        .iter()
        .filter(|s| (s.date - target).abs() <= Duration::days(3))
        .min_by_key(|s| (s.date - target).abs())
        .unwrap_or(&earlier[earlier.len() - 1])
}

/// Net balance change of one exchange over ~24h, split into stablecoins,
/// majors (BTC/ETH family) and everything else.
pub fn analyze_exchange(
    exchange: &str,
    history: &[BalanceSnapshot],
    taxonomy: &Taxonomy,
    now: DateTime<Utc>,
) -> ExchangeFlow {
    let tier1 = taxonomy.is_tier1(exchange);

    let Some(latest) = history.last().filter(|_| history.len() >= 2) else {
        tracing::debug!(exchange, points = history.len(), "Not enough balance history");
        return ExchangeFlow {
            exchange: exchange.to_string(),
            total_usd: history
                .last()
                .map(|s| s.tokens.values().copied().sum())
                .unwrap_or(Decimal::ZERO),
            net_flow_24h_usd: Decimal::ZERO,
            stablecoin_flow_24h_usd: Decimal::ZERO,
            major_flow_24h_usd: Decimal::ZERO,
            other_flow_24h_usd: Decimal::ZERO,
            stablecoin_flow_4h_usd: Decimal::ZERO,
            major_flow_4h_usd: Decimal::ZERO,
            tier1,
            breakdown: Vec::new(),
            tags: Vec::new(),
            confidence: INSUFFICIENT_CONFIDENCE,
        };
    };

    let prev = baseline(history, latest);
    let symbols: BTreeSet<&String> = latest.tokens.keys().chain(prev.tokens.keys()).collect();
    let min_flow = Decimal::from(MIN_TOKEN_FLOW_USD);

    let mut stable = Decimal::ZERO;
    let mut major = Decimal::ZERO;
    let mut other = Decimal::ZERO;
    let mut breakdown = Vec::new();

    for symbol in symbols {
        let now_usd = latest.tokens.get(symbol).copied().unwrap_or_default();
        let then_usd = prev.tokens.get(symbol).copied().unwrap_or_default();
        let flow = now_usd - then_usd;
        if flow.abs() < min_flow {
            continue;
        }

        if taxonomy.is_stablecoin(symbol) {
            stable += flow;
        } else if taxonomy.is_major(symbol) {
            major += flow;
        } else {
            other += flow;
        }
        breakdown.push(TokenFlow {
            symbol: symbol.clone(),
            flow_24h_usd: flow,
        });
    }

    breakdown.sort_by(|a, b| {
        b.flow_24h_usd
            .abs()
            .cmp(&a.flow_24h_usd.abs())
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
    breakdown.truncate(MAX_BREAKDOWN);

    let net = stable + major + other;
    let quarter = Decimal::new(25, 2);

    let mut confidence: i32 = 100;
    let staleness = now - latest.date;
    if staleness > Duration::hours(24) {
        confidence -= 30;
    }
    if staleness > Duration::hours(48) {
        confidence -= 30;
    }
    if latest.tokens.len() < 5 {
        confidence -= 20;
    }

    let mut tags = Vec::new();
    if stable > usd_m(50) {
        tags.push(ReasonTag::StablecoinAccumulation);
    }
    if major > usd_m(100) {
        tags.push(ReasonTag::DistributionWarning);
    }
    if stable < usd_m(-10) && major < usd_m(-10) {
        tags.push(ReasonTag::Withdrawal);
    }
    if net < usd_m(-50) {
        tags.push(ReasonTag::CapitalOutflow);
    } else if net > usd_m(50) {
        tags.push(ReasonTag::CapitalInflow);
    }

    ExchangeFlow {
        exchange: exchange.to_string(),
        total_usd: latest.tokens.values().copied().sum(),
        net_flow_24h_usd: net,
        stablecoin_flow_24h_usd: stable,
        major_flow_24h_usd: major,
        other_flow_24h_usd: other,
        // No intraday balances; a quarter of the daily move
        stablecoin_flow_4h_usd: stable * quarter,
        major_flow_4h_usd: major * quarter,
        tier1,
        breakdown,
        tags,
        confidence: confidence.clamp(0, 100) as u8,
    }
}

/// 24h stablecoin inflow into tier-1 venues.
pub fn smart_money_flow(flows: &[ExchangeFlow]) -> Decimal {
    flows
        .iter()
        .filter(|f| f.tier1 && f.confidence > INSUFFICIENT_CONFIDENCE)
        .map(|f| f.stablecoin_flow_24h_usd)
        .sum()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intelligence::taxonomy::bundled;
    use chrono::TimeZone;

    fn snap(date: DateTime<Utc>, tokens: &[(&str, i64)]) -> BalanceSnapshot {
        BalanceSnapshot {
            date,
            tokens: tokens
                .iter()
                .map(|(s, v)| (s.to_string(), Decimal::from(*v)))
                .collect(),
        }
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_flows_split_by_category() {
        let t = bundled();
        let history = vec![
            snap(day(1), &[("USDT", 1_000_000_000), ("BTC", 2_000_000_000), ("SOL", 300_000_000), ("DOGE", 5_000_000), ("XRP", 1)]),
            snap(day(2), &[("USDT", 1_080_000_000), ("BTC", 2_150_000_000), ("SOL", 290_000_000), ("DOGE", 5_050_000), ("XRP", 1)]),
        ];
        let flow = analyze_exchange("binance-cex", &history, &t, day(2));

        assert_eq!(flow.stablecoin_flow_24h_usd, usd_m(80));
        assert_eq!(flow.major_flow_24h_usd, usd_m(150));
        assert_eq!(flow.other_flow_24h_usd, usd_m(-10));
        // DOGE moved less than $100k
        assert_eq!(flow.breakdown.len(), 3);
        assert_eq!(flow.breakdown[0].symbol, "BTC");
        assert_eq!(flow.stablecoin_flow_4h_usd, usd_m(20));
        assert_eq!(flow.confidence, 100);
        assert!(flow.tier1);
        assert!(flow.tags.contains(&ReasonTag::StablecoinAccumulation));
        assert!(flow.tags.contains(&ReasonTag::DistributionWarning));
        assert!(flow.tags.contains(&ReasonTag::CapitalInflow));
    }

    #[test]
    fn test_baseline_prefers_24h_ago() {
        let t = bundled();
        let history = vec![
            snap(day(1), &[("USDT", 0)]),
            snap(day(3), &[("USDT", 100_000_000)]),
            snap(day(4), &[("USDT", 130_000_000)]),
        ];
        let flow = analyze_exchange("okx", &history, &t, day(4));
        assert_eq!(flow.stablecoin_flow_24h_usd, usd_m(30));
    }

    #[test]
    fn test_stale_and_thin_data_lowers_confidence() {
        let t = bundled();
        let history = vec![snap(day(1), &[("USDT", 1)]), snap(day(2), &[("USDT", 2)])];
        let flow = analyze_exchange("kraken", &history, &t, day(5));
        // -30 stale, -30 very stale, -20 few tokens
        assert_eq!(flow.confidence, 20);
    }

    #[test]
    fn test_insufficient_history() {
        let t = bundled();
        let flow = analyze_exchange("bybit", &[snap(day(1), &[("USDT", 5)])], &t, day(1));
        assert_eq!(flow.confidence, 20);
        assert_eq!(flow.total_usd, Decimal::from(5));
        assert!(flow.net_flow_24h_usd.is_zero());
    }

    #[test]
    fn test_withdrawal_tag() {
        let t = bundled();
        let history = vec![
            snap(day(1), &[("USDC", 500_000_000), ("ETH", 900_000_000)]),
            snap(day(2), &[("USDC", 480_000_000), ("ETH", 870_000_000)]),
        ];
        let flow = analyze_exchange("coinbase", &history, &t, day(2));
        assert!(flow.tags.contains(&ReasonTag::Withdrawal));
        assert!(!flow.tags.contains(&ReasonTag::CapitalOutflow));
    }

    #[test]
    fn test_smart_money_counts_tier1_only() {
        let t = bundled();
        let history = vec![
            snap(day(1), &[("USDT", 0), ("A", 1), ("B", 1), ("C", 1), ("D", 1)]),
            snap(day(2), &[("USDT", 60_000_000), ("A", 1), ("B", 1), ("C", 1), ("D", 1)]),
        ];
        let tier1 = analyze_exchange("binance-cex", &history, &t, day(2));
        let other = analyze_exchange("gate-io", &history, &t, day(2));
        assert_eq!(smart_money_flow(&[tier1, other]), usd_m(60));
    }
}
