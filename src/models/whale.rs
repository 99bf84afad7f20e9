use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::RawPairSnapshot;

/// A pair that passed every accumulation gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccumulationCandidate {
    pub pair: RawPairSnapshot,
    pub age_days: Decimal,
    pub avg_ticket_usd: Decimal,
    pub net_buy_ratio_pct: Decimal,
    pub whale_score: Decimal,
}

impl AccumulationCandidate {
    pub fn symbol(&self) -> &str {
        &self.pair.base_symbol
    }
}
