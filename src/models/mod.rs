pub mod balance;
pub mod flow;
pub mod market;
pub mod pair;
pub mod position;
pub mod signal;
pub mod whale;

pub use balance::{BalanceSnapshot, ChainFlow, ExchangeFlow, TokenFlow, TvlPoint};
pub use flow::{CategoryFlowStat, FlowBreakdown, FlowCategory, MarketBreadth, RotationPhase};
pub use market::{FearGreed, MarketIndicators};
pub use pair::{PriceChange, RawPairSnapshot};
pub use position::{PaperPosition, PositionStatus};
pub use signal::{
    Action, AgentRole, AgentVote, AgentWeights, ConsensusResult, Opportunity, OpportunityKind,
    ReasonTag, SupportingMetrics, TradeStats, Verdict, MAX_AGENT_WEIGHT, MIN_AGENT_WEIGHT,
};
pub use whale::AccumulationCandidate;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for longs, -1 for shorts. Multiplying a raw price move by this
    /// gives the position's PnL sign.
    pub fn sign(&self) -> Decimal {
        match self {
            Direction::Long => Decimal::ONE,
            Direction::Short => Decimal::NEGATIVE_ONE,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

// ---------------------------------------------------------------------------
// Confidence marker
// ---------------------------------------------------------------------------

/// Attached to any computation that had to fall back to a neutral default
/// because its inputs were missing or too thin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    #[default]
    Normal,
    Low,
}

impl Confidence {
    pub fn is_low(&self) -> bool {
        matches!(self, Confidence::Low)
    }
}
