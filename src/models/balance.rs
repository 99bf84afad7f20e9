use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Confidence, ReasonTag};

/// One point of a chain's TVL history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TvlPoint {
    pub date: DateTime<Utc>,
    pub tvl_usd: Decimal,
}

/// An exchange's per-token USD holdings at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub date: DateTime<Utc>,
    pub tokens: BTreeMap<String, Decimal>,
}

/// Capital movement on one chain, derived from its TVL history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainFlow {
    pub chain: String,
    pub tvl_usd: Decimal,
    pub flow_24h_usd: Decimal,
    pub change_24h_pct: Decimal,
    /// Only known when the history has intraday resolution.
    pub flow_4h_usd: Option<Decimal>,
    pub change_7d_pct: Decimal,
    pub stable_ratio: Decimal,
    pub stable_inflow_24h_usd: Decimal,
    pub native_inflow_24h_usd: Decimal,
    pub tags: Vec<ReasonTag>,
    pub confidence: Confidence,
}

impl ChainFlow {
    /// Neutral record for a chain whose history was too short to diff.
    pub fn insufficient(chain: &str) -> Self {
        Self {
            chain: chain.to_string(),
            tvl_usd: Decimal::ZERO,
            flow_24h_usd: Decimal::ZERO,
            change_24h_pct: Decimal::ZERO,
            flow_4h_usd: None,
            change_7d_pct: Decimal::ZERO,
            stable_ratio: Decimal::ZERO,
            stable_inflow_24h_usd: Decimal::ZERO,
            native_inflow_24h_usd: Decimal::ZERO,
            tags: Vec::new(),
            confidence: Confidence::Low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenFlow {
    pub symbol: String,
    pub flow_24h_usd: Decimal,
}

/// Net balance change of one centralized exchange over ~24h.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeFlow {
    pub exchange: String,
    pub total_usd: Decimal,
    pub net_flow_24h_usd: Decimal,
    pub stablecoin_flow_24h_usd: Decimal,
    /// BTC/ETH and their wrapped/staked forms.
    pub major_flow_24h_usd: Decimal,
    pub other_flow_24h_usd: Decimal,
    pub stablecoin_flow_4h_usd: Decimal,
    pub major_flow_4h_usd: Decimal,
    pub tier1: bool,
    pub breakdown: Vec<TokenFlow>,
    pub tags: Vec<ReasonTag>,
    /// 0–100.
    pub confidence: u8,
}
