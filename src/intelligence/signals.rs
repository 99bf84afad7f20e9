use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::taxonomy::Taxonomy;
use crate::models::{
    ChainFlow, Direction, ExchangeFlow, MarketIndicators, Opportunity, OpportunityKind, ReasonTag,
    SupportingMetrics,
};

const BASE_SCORE: i64 = 60;
const TREND_BONUS: i64 = 20;
const FLOW_BONUS: i64 = 10;
const FUNDING_PENALTY: i64 = 30;
const FUNDING_BONUS: i64 = 10;
const EXCHANGE_ACCUMULATION_SCORE: i64 = 90;
const EXCHANGE_DISTRIBUTION_SCORE: i64 = 85;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalThresholds {
    pub long_emit_score: Decimal,
    pub short_emit_score: Decimal,
    pub large_flow_usd: Decimal,
    /// Funding (percent per interval) above this marks overheated longs.
    pub overheated_funding_pct: Decimal,
    pub exchange_flow_4h_usd: Decimal,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            long_emit_score: Decimal::from(85),
            short_emit_score: Decimal::from(80),
            large_flow_usd: Decimal::from(10_000_000),
            overheated_funding_pct: Decimal::new(3, 2), // 0.03%
            exchange_flow_4h_usd: Decimal::from(20_000_000),
        }
    }
}

/// Flow direction used to confirm the 24h move: the 4h flow when the
/// history has intraday points, otherwise the 7d change.
fn trend(chain: &ChainFlow) -> Decimal {
    chain.flow_4h_usd.unwrap_or(chain.change_7d_pct)
}

fn clamp_score(score: Decimal) -> Decimal {
    score.max(Decimal::ZERO).min(Decimal::ONE_HUNDRED)
}

/// Long score for a chain with positive 24h flow.
pub fn score_long(
    chain: &ChainFlow,
    funding_pct: Option<Decimal>,
    t: &SignalThresholds,
) -> (Decimal, Vec<ReasonTag>) {
    let mut score = BASE_SCORE;
    let mut tags = vec![ReasonTag::CapitalInflow];

    if trend(chain) > Decimal::ZERO {
        score += TREND_BONUS;
        tags.push(ReasonTag::TrendConfirmed);
    }
    if chain.flow_24h_usd > t.large_flow_usd {
        score += FLOW_BONUS;
        tags.push(ReasonTag::LargeFlow);
    }
    if let Some(funding) = funding_pct {
        if funding > t.overheated_funding_pct {
            score -= FUNDING_PENALTY;
            tags.push(ReasonTag::OverheatedFunding);
        } else if funding < Decimal::ZERO {
            score += FUNDING_BONUS;
            tags.push(ReasonTag::SqueezePotential);
        }
    }

    (clamp_score(Decimal::from(score)), tags)
}

/// Mirror of [`score_long`] for a chain with negative 24h flow.
pub fn score_short(
    chain: &ChainFlow,
    funding_pct: Option<Decimal>,
    t: &SignalThresholds,
) -> (Decimal, Vec<ReasonTag>) {
    let mut score = BASE_SCORE;
    let mut tags = vec![ReasonTag::CapitalOutflow];

    if trend(chain) < Decimal::ZERO {
        score += TREND_BONUS;
        tags.push(ReasonTag::TrendConfirmed);
    }
    if chain.flow_24h_usd < -t.large_flow_usd {
        score += FLOW_BONUS;
        tags.push(ReasonTag::LargeFlow);
    }
    if let Some(funding) = funding_pct {
        if funding < Decimal::ZERO {
            score -= FUNDING_PENALTY;
            tags.push(ReasonTag::CrowdedShorts);
        } else if funding > t.overheated_funding_pct {
            score += FUNDING_BONUS;
            tags.push(ReasonTag::OverheatedFunding);
        }
    }

    (clamp_score(Decimal::from(score)), tags)
}

fn merge_tags(mut tags: Vec<ReasonTag>, extra: &[ReasonTag]) -> Vec<ReasonTag> {
    for tag in extra {
        if !tags.contains(tag) {
            tags.push(*tag);
        }
    }
    tags
}

/// Chain-level opportunities. `whale_chains` holds lowercase chain ids on
/// which the whale detector found accumulation.
pub fn chain_opportunities(
    chains: &[ChainFlow],
    indicators: &MarketIndicators,
    taxonomy: &Taxonomy,
    whale_chains: &HashSet<String>,
    t: &SignalThresholds,
) -> Vec<Opportunity> {
    let mut out = Vec::new();

    for chain in chains {
        if chain.confidence.is_low() {
            continue;
        }

        let funding = indicators.funding_or_btc(taxonomy.native_symbol(&chain.chain));

        let (direction, score, tags, bar) = if chain.flow_24h_usd > Decimal::ZERO {
            let (score, tags) = score_long(chain, funding, t);
            (Direction::Long, score, tags, t.long_emit_score)
        } else if chain.flow_24h_usd < Decimal::ZERO {
            let (score, tags) = score_short(chain, funding, t);
            (Direction::Short, score, tags, t.short_emit_score)
        } else {
            continue;
        };

        tracing::debug!(
            chain = %chain.chain,
            direction = %direction,
            %score,
            "Chain scored"
        );

        if score < bar {
            continue;
        }

        let mut tags = merge_tags(tags, &chain.tags);
        if whale_chains.contains(&chain.chain.to_lowercase()) && direction == Direction::Long {
            tags.push(ReasonTag::WhaleAccumulation);
        }

        out.push(Opportunity {
            asset_id: chain.chain.clone(),
            kind: OpportunityKind::Chain,
            direction,
            score,
            tags,
            metrics: SupportingMetrics {
                flow_24h_usd: Some(chain.flow_24h_usd),
                flow_4h_usd: chain.flow_4h_usd,
                change_7d_pct: Some(chain.change_7d_pct),
                funding_rate_pct: funding,
                tvl_usd: Some(chain.tvl_usd),
            },
            consensus: None,
        });
    }

    out
}

/// Exchange-level rules on estimated 4h flows.
pub fn exchange_opportunities(flows: &[ExchangeFlow], t: &SignalThresholds) -> Vec<Opportunity> {
    let mut out = Vec::new();

    for flow in flows {
        let metrics = |flow_4h: Decimal, flow_24h: Decimal| SupportingMetrics {
            flow_24h_usd: Some(flow_24h),
            flow_4h_usd: Some(flow_4h),
            tvl_usd: Some(flow.total_usd),
            ..SupportingMetrics::default()
        };

        if flow.stablecoin_flow_4h_usd > t.exchange_flow_4h_usd {
            let mut tags = vec![ReasonTag::StablecoinAccumulation];
            if flow.tier1 {
                tags.push(ReasonTag::SmartMoney);
            }
            out.push(Opportunity {
                asset_id: flow.exchange.clone(),
                kind: OpportunityKind::Exchange,
                direction: Direction::Long,
                score: Decimal::from(EXCHANGE_ACCUMULATION_SCORE),
                tags,
                metrics: metrics(flow.stablecoin_flow_4h_usd, flow.stablecoin_flow_24h_usd),
                consensus: None,
            });
        }

        if flow.major_flow_4h_usd > t.exchange_flow_4h_usd {
            out.push(Opportunity {
                asset_id: flow.exchange.clone(),
                kind: OpportunityKind::Exchange,
                direction: Direction::Short,
                score: Decimal::from(EXCHANGE_DISTRIBUTION_SCORE),
                tags: vec![ReasonTag::DistributionWarning],
                metrics: metrics(flow.major_flow_4h_usd, flow.major_flow_24h_usd),
                consensus: None,
            });
        }
    }

    out
}

/// Merge, clamp and rank: highest score first, ties by asset id.
pub fn rank_opportunities(mut opportunities: Vec<Opportunity>) -> Vec<Opportunity> {
    for opp in &mut opportunities {
        opp.score = clamp_score(opp.score);
    }
    opportunities.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.asset_id.cmp(&b.asset_id)));
    opportunities
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
