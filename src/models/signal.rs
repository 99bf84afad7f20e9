use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::Direction;

// ---------------------------------------------------------------------------
// Reason tags
// ---------------------------------------------------------------------------

/// Why an opportunity was raised. Agents vote on these, never on free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonTag {
    CapitalInflow,
    CapitalOutflow,
    TrendConfirmed,
    LargeFlow,
    OverheatedFunding,
    SqueezePotential,
    CrowdedShorts,
    StablecoinAccumulation,
    DistributionWarning,
    SmartMoney,
    TvlGrowth,
    CapitalFlight,
    BuyingPower,
    Withdrawal,
    WhaleAccumulation,
}

impl ReasonTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonTag::CapitalInflow => "capital_inflow",
            ReasonTag::CapitalOutflow => "capital_outflow",
            ReasonTag::TrendConfirmed => "trend_confirmed",
            ReasonTag::LargeFlow => "large_flow",
            ReasonTag::OverheatedFunding => "overheated_funding",
            ReasonTag::SqueezePotential => "squeeze_potential",
            ReasonTag::CrowdedShorts => "crowded_shorts",
            ReasonTag::StablecoinAccumulation => "stablecoin_accumulation",
            ReasonTag::DistributionWarning => "distribution_warning",
            ReasonTag::SmartMoney => "smart_money",
            ReasonTag::TvlGrowth => "tvl_growth",
            ReasonTag::CapitalFlight => "capital_flight",
            ReasonTag::BuyingPower => "buying_power",
            ReasonTag::Withdrawal => "withdrawal",
            ReasonTag::WhaleAccumulation => "whale_accumulation",
        }
    }

    pub fn is_outflow(&self) -> bool {
        matches!(self, ReasonTag::CapitalOutflow | ReasonTag::CapitalFlight)
    }

    pub fn is_smart_money(&self) -> bool {
        matches!(
            self,
            ReasonTag::SmartMoney | ReasonTag::StablecoinAccumulation | ReasonTag::WhaleAccumulation
        )
    }
}

impl fmt::Display for ReasonTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Opportunity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityKind {
    Chain,
    Exchange,
}

/// Numbers that backed the score, kept for the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupportingMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_24h_usd: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_4h_usd: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_7d_pct: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub funding_rate_pct: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tvl_usd: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub asset_id: String,
    pub kind: OpportunityKind,
    pub direction: Direction,
    /// 0–100.
    pub score: Decimal,
    pub tags: Vec<ReasonTag>,
    pub metrics: SupportingMetrics,
    pub consensus: Option<ConsensusResult>,
}

impl Opportunity {
    pub fn has_tag(&self, tag: ReasonTag) -> bool {
        self.tags.contains(&tag)
    }
}

// ---------------------------------------------------------------------------
// Agents & consensus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Momentum,
    RiskControl,
    Fundamentals,
}

impl AgentRole {
    pub const ALL: [AgentRole; 3] = [
        AgentRole::Momentum,
        AgentRole::RiskControl,
        AgentRole::Fundamentals,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            AgentRole::Momentum => "Momentum",
            AgentRole::RiskControl => "Risk Control",
            AgentRole::Fundamentals => "Fundamentals",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentVote {
    pub agent: AgentRole,
    /// -1..1.
    pub vote: Decimal,
    pub weight: Decimal,
    pub comment: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    StrongBuy,
    Buy,
    Neutral,
    Sell,
    StrongSell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ExecuteMax,
    ExecuteNormal,
    Wait,
    Reduce,
    DumpAll,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusResult {
    pub verdict: Verdict,
    pub action: Action,
    /// -100..100.
    pub consensus_score: Decimal,
    pub votes: Vec<AgentVote>,
}

// ---------------------------------------------------------------------------
// Agent weights
// ---------------------------------------------------------------------------

pub const MIN_AGENT_WEIGHT: Decimal = Decimal::from_parts(5, 0, 0, false, 1);
pub const MAX_AGENT_WEIGHT: Decimal = Decimal::from_parts(2, 0, 0, false, 0);

/// Outcome summary the weight adapter computed on its last run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeStats {
    pub total_trades: usize,
    pub win_rate_pct: Decimal,
    pub avg_pnl_pct: Decimal,
    pub long_losses: usize,
    pub short_losses: usize,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Per-agent vote multipliers, persisted between cycles and only changed
/// by the weight adapter. Always within [0.5, 2.0].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentWeights {
    pub weights: BTreeMap<AgentRole, Decimal>,
    pub stats: TradeStats,
}

impl Default for AgentWeights {
    fn default() -> Self {
        Self {
            weights: AgentRole::ALL.iter().map(|r| (*r, Decimal::ONE)).collect(),
            stats: TradeStats::default(),
        }
    }
}

impl AgentWeights {
    pub fn get(&self, role: AgentRole) -> Decimal {
        self.weights.get(&role).copied().unwrap_or(Decimal::ONE)
    }

    /// Store `value` clamped to the legal weight range.
    pub fn set(&mut self, role: AgentRole, value: Decimal) {
        self.weights
            .insert(role, value.clamp(MIN_AGENT_WEIGHT, MAX_AGENT_WEIGHT));
    }

    /// Fill in missing agents and pull out-of-range values (e.g. a hand-edited
    /// document) back into range.
    pub fn normalized(mut self) -> Self {
        for role in AgentRole::ALL {
            let w = self.get(role);
            self.set(role, w);
        }
        self
    }
}
