use rust_decimal::Decimal;

use crate::models::{
    Action, AgentRole, AgentVote, AgentWeights, ConsensusResult, MarketIndicators, Opportunity,
    ReasonTag, Verdict,
};

fn d(mantissa: i64, scale: u32) -> Decimal {
    Decimal::new(mantissa, scale)
}

fn first_tag(opp: &Opportunity, pred: impl Fn(&ReasonTag) -> bool) -> Option<ReasonTag> {
    opp.tags.iter().copied().find(|t| pred(t))
}

/// Trend follower: rewards strong scores, backs off on any outflow reason.
pub fn momentum_vote(opp: &Opportunity) -> (Decimal, String) {
    if let Some(tag) = first_tag(opp, ReasonTag::is_outflow) {
        return (Decimal::NEGATIVE_ONE, format!("Outflow detected ({tag})"));
    }
    if opp.score > Decimal::from(80) {
        (Decimal::ONE, format!("Strong signal, score {}", opp.score))
    } else if opp.score > Decimal::from(50) {
        (d(5, 1), format!("Moderate signal, score {}", opp.score))
    } else {
        (Decimal::ZERO, "Weak signal".into())
    }
}

/// Contrarian: fades greed and crowded leverage, likes fear.
pub fn risk_vote(opp: &Opportunity, indicators: &MarketIndicators) -> (Decimal, String) {
    let fear_greed = indicators.fear_greed_value();
    let funding = opp
        .metrics
        .funding_rate_pct
        .or_else(|| indicators.btc_funding());

    if let Some(fg) = fear_greed.filter(|v| *v > 80) {
        return (Decimal::NEGATIVE_ONE, format!("Extreme greed ({fg})"));
    }
    if let Some(rate) = funding.filter(|r| *r > d(5, 2)) {
        return (Decimal::NEGATIVE_ONE, format!("Funding overheated ({rate}%)"));
    }
    if let Some(fg) = fear_greed.filter(|v| *v < 20) {
        return (Decimal::ONE, format!("Extreme fear ({fg})"));
    }
    if let Some(rate) = funding.filter(|r| *r < Decimal::ZERO) {
        return (d(6, 1), format!("Negative funding ({rate}%)"));
    }
    (d(2, 1), "No risk flags".into())
}

pub fn fundamentals_vote(opp: &Opportunity) -> (Decimal, String) {
    if let Some(tag) = first_tag(opp, ReasonTag::is_smart_money) {
        return (Decimal::ONE, format!("Smart money ({tag})"));
    }
    if opp.has_tag(ReasonTag::TvlGrowth) {
        return (d(8, 1), "TVL growing".into());
    }
    if let Some(tag) = first_tag(opp, ReasonTag::is_outflow) {
        return (d(-5, 1), format!("Capital leaving ({tag})"));
    }
    (Decimal::ZERO, "No fundamental edge".into())
}

/// Persisted weights adjusted for the macro regime: a positive bias boosts
/// momentum, a negative one boosts risk control.
pub fn effective_weight(role: AgentRole, weights: &AgentWeights, macro_bias: Decimal) -> Decimal {
    let base = weights.get(role);
    match role {
        AgentRole::Momentum if macro_bias > Decimal::ZERO => base * (Decimal::ONE + macro_bias),
        AgentRole::RiskControl if macro_bias < Decimal::ZERO => {
            base * (Decimal::ONE + macro_bias.abs())
        }
        _ => base,
    }
}

pub fn verdict_for(consensus_score: Decimal) -> (Verdict, Action) {
    if consensus_score > Decimal::from(50) {
        (Verdict::StrongBuy, Action::ExecuteMax)
    } else if consensus_score > Decimal::from(20) {
        (Verdict::Buy, Action::ExecuteNormal)
    } else if consensus_score < Decimal::from(-50) {
        (Verdict::StrongSell, Action::DumpAll)
    } else if consensus_score < Decimal::from(-20) {
        (Verdict::Sell, Action::Reduce)
    } else {
        (Verdict::Neutral, Action::Wait)
    }
}

/// One weighted vote round on a single opportunity.
pub fn debate(
    opp: &Opportunity,
    indicators: &MarketIndicators,
    weights: &AgentWeights,
    macro_bias: Decimal,
) -> ConsensusResult {
    let votes: Vec<AgentVote> = AgentRole::ALL
        .iter()
        .map(|&agent| {
            let (vote, comment) = match agent {
                AgentRole::Momentum => momentum_vote(opp),
                AgentRole::RiskControl => risk_vote(opp, indicators),
                AgentRole::Fundamentals => fundamentals_vote(opp),
            };
            AgentVote {
                agent,
                vote,
                weight: effective_weight(agent, weights, macro_bias),
                comment,
            }
        })
        .collect();

    let total_weight: Decimal = votes.iter().map(|v| v.weight).sum();
    let weighted: Decimal = votes.iter().map(|v| v.vote * v.weight).sum();
    let avg = if total_weight.is_zero() {
        Decimal::ZERO
    } else {
        weighted / total_weight
    };

    let consensus_score = (avg * Decimal::ONE_HUNDRED)
        .clamp(Decimal::from(-100), Decimal::ONE_HUNDRED);
    let (verdict, action) = verdict_for(consensus_score);

    ConsensusResult {
        verdict,
        action,
        consensus_score: consensus_score.round_dp(2),
        votes,
    }
}

/// Attach a consensus to every opportunity in place.
pub fn run_debates(
    opportunities: &mut [Opportunity],
    indicators: &MarketIndicators,
    weights: &AgentWeights,
    macro_bias: Decimal,
) {
    for opp in opportunities.iter_mut() {
        let result = debate(opp, indicators, weights, macro_bias);
        tracing::debug!(
            asset = %opp.asset_id,
            direction = %opp.direction,
            consensus = %result.consensus_score,
            verdict = ?result.verdict,
            "Debate finished"
        );
        opp.consensus = Some(result);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
