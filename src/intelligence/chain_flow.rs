use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use crate::models::{ChainFlow, Confidence, ReasonTag, TvlPoint};

/// Share of a chain's TVL assumed to be stablecoins when supply is unknown.
const DEFAULT_STABLE_RATIO: Decimal = Decimal::from_parts(3, 0, 0, false, 1);
const MAX_STABLE_RATIO: Decimal = Decimal::from_parts(8, 0, 0, false, 1);

fn change_pct(from: Decimal, to: Decimal) -> Decimal {
    if from.is_zero() {
        Decimal::ZERO
    } else {
        (to - from) / from * Decimal::ONE_HUNDRED
    }
}

/// Latest point at or before `cutoff`.
fn point_before(history: &[TvlPoint], cutoff: DateTime<Utc>) -> Option<&TvlPoint> {
    history.iter().rev().find(|p| p.date <= cutoff)
}

/// Stablecoin share of TVL, capped, with a fallback when supply is unknown.
pub fn stable_ratio(tvl_usd: Decimal, stable_supply_usd: Option<Decimal>) -> Decimal {
    match stable_supply_usd {
        Some(supply) if tvl_usd > Decimal::ZERO && supply > Decimal::ZERO => {
            (supply / tvl_usd).min(MAX_STABLE_RATIO)
        }
        _ => DEFAULT_STABLE_RATIO,
    }
}

/// Derive 24h/4h/7d capital movement for one chain from its TVL history
/// (oldest first). Fewer than two points yields a neutral, low-confidence
/// record.
pub fn analyze_chain(
    chain: &str,
    history: &[TvlPoint],
    stable_supply_usd: Option<Decimal>,
) -> ChainFlow {
    let [.., prev, latest] = history else {
        tracing::debug!(chain, points = history.len(), "Not enough TVL history");
        return ChainFlow::insufficient(chain);
    };

    let flow_24h = latest.tvl_usd - prev.tvl_usd;
    let change_24h_pct = change_pct(prev.tvl_usd, latest.tvl_usd);

    let week_ago = point_before(history, latest.date - Duration::days(7)).unwrap_or(&history[0]);
    let change_7d_pct = change_pct(week_ago.tvl_usd, latest.tvl_usd);

    // Only meaningful when the series has intraday points
    let flow_4h = point_before(history, latest.date - Duration::hours(4))
        .filter(|p| latest.date - p.date < Duration::hours(24))
        .map(|p| latest.tvl_usd - p.tvl_usd);

    let ratio = stable_ratio(latest.tvl_usd, stable_supply_usd);
    let stable_inflow = flow_24h * ratio;
    let native_inflow = flow_24h - stable_inflow;

    let mut tags = Vec::new();
    if flow_24h > Decimal::ZERO {
        tags.push(ReasonTag::CapitalInflow);
        if stable_inflow > native_inflow {
            tags.push(ReasonTag::BuyingPower);
        }
    } else if flow_24h < Decimal::ZERO {
        tags.push(ReasonTag::CapitalOutflow);
    }
    if change_24h_pct > Decimal::from(5) {
        tags.push(ReasonTag::TvlGrowth);
    } else if change_24h_pct < Decimal::from(-5) {
        tags.push(ReasonTag::CapitalFlight);
    }

    ChainFlow {
        chain: chain.to_string(),
        tvl_usd: latest.tvl_usd,
        flow_24h_usd: flow_24h,
        change_24h_pct,
        flow_4h_usd: flow_4h,
        change_7d_pct,
        stable_ratio: ratio,
        stable_inflow_24h_usd: stable_inflow,
        native_inflow_24h_usd: native_inflow,
        tags,
        confidence: Confidence::Normal,
    }
}

/// Net stablecoin inflow across all analyzed chains.
pub fn total_stable_inflow(chains: &[ChainFlow]) -> Decimal {
    chains
        .iter()
        .filter(|c| !c.confidence.is_low())
        .map(|c| c.stable_inflow_24h_usd)
        .sum()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn daily(tvls: &[i64]) -> Vec<TvlPoint> {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        tvls.iter()
            .enumerate()
            .map(|(i, &tvl)| TvlPoint {
                date: start + Duration::days(i as i64),
                tvl_usd: Decimal::from(tvl),
            })
            .collect()
    }

    #[test]
    fn test_insufficient_history() {
        let flow = analyze_chain("Ethereum", &daily(&[100]), None);
        assert_eq!(flow.confidence, Confidence::Low);
        assert!(flow.flow_24h_usd.is_zero());
        assert!(flow.tags.is_empty());

        assert!(analyze_chain("Ethereum", &[], None).confidence.is_low());
    }

    #[test]
    fn test_daily_flows() {
        // 8 days: 7d baseline is the first point
        let history = daily(&[
            1_000_000_000, 1_010_000_000, 1_020_000_000, 1_030_000_000,
            1_040_000_000, 1_050_000_000, 1_060_000_000, 1_100_000_000,
        ]);
        let flow = analyze_chain("Ethereum", &history, None);

        assert_eq!(flow.flow_24h_usd, Decimal::from(40_000_000));
        assert_eq!(flow.change_7d_pct, Decimal::from(10));
        assert_eq!(flow.flow_4h_usd, None);
        assert_eq!(flow.stable_ratio, Decimal::new(3, 1));
        assert_eq!(flow.stable_inflow_24h_usd, Decimal::from(12_000_000));
        assert_eq!(flow.native_inflow_24h_usd, Decimal::from(28_000_000));
        assert!(flow.tags.contains(&ReasonTag::CapitalInflow));
        assert!(!flow.tags.contains(&ReasonTag::BuyingPower));
    }

    #[test]
    fn test_intraday_history_has_4h_flow() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let history: Vec<TvlPoint> = [100, 110, 130]
            .iter()
            .enumerate()
            .map(|(i, &tvl)| TvlPoint {
                date: start + Duration::hours(4 * i as i64),
                tvl_usd: Decimal::from(tvl),
            })
            .collect();
        let flow = analyze_chain("Base", &history, None);
        assert_eq!(flow.flow_4h_usd, Some(Decimal::from(20)));
    }

    #[test]
    fn test_stable_ratio_capped_and_defaulted() {
        let tvl = Decimal::from(1_000);
        assert_eq!(stable_ratio(tvl, Some(Decimal::from(500))), Decimal::new(5, 1));
        assert_eq!(stable_ratio(tvl, Some(Decimal::from(5_000))), Decimal::new(8, 1));
        assert_eq!(stable_ratio(tvl, None), Decimal::new(3, 1));
        assert_eq!(stable_ratio(Decimal::ZERO, Some(tvl)), Decimal::new(3, 1));
    }

    #[test]
    fn test_buying_power_and_flight_tags() {
        let flow = analyze_chain("Tron", &daily(&[1_000, 1_100]), Some(Decimal::from(800)));
        assert!(flow.tags.contains(&ReasonTag::BuyingPower));
        assert!(flow.tags.contains(&ReasonTag::TvlGrowth));

        let flow = analyze_chain("Tron", &daily(&[1_000, 900]), None);
        assert!(flow.tags.contains(&ReasonTag::CapitalOutflow));
        assert!(flow.tags.contains(&ReasonTag::CapitalFlight));
    }

    #[test]
    fn test_total_stable_inflow_ignores_low_confidence() {
        let a = analyze_chain("A", &daily(&[1_000, 1_100]), None);
        let mut b = analyze_chain("B", &daily(&[1_000, 1_200]), None);
        b.confidence = Confidence::Low;
        assert_eq!(total_stable_inflow(&[a, b]), Decimal::from(30));
    }
}
