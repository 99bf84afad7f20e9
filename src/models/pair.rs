use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceChange {
    pub m5: Decimal,
    pub h1: Decimal,
    pub h24: Decimal,
}

/// One DEX pair observation. Built once per fetch cycle and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPairSnapshot {
    pub chain_id: String,
    pub pair_address: String,
    pub base_symbol: String,
    pub quote_symbol: String,
    pub liquidity_usd: Decimal,
    pub volume_24h_usd: Decimal,
    pub volume_1h_usd: Decimal,
    pub price_usd: Decimal,
    pub price_change: PriceChange,
    pub buys_24h: u64,
    pub sells_24h: u64,
    pub pair_age_hours: Decimal,
    pub pair_url: String,
}

impl RawPairSnapshot {
    pub fn total_txns(&self) -> u64 {
        self.buys_24h + self.sells_24h
    }

    /// Signed buy pressure: buys minus sells over 24h.
    pub fn net_txns(&self) -> i64 {
        self.buys_24h as i64 - self.sells_24h as i64
    }

    pub fn age_days(&self) -> Decimal {
        self.pair_age_hours / Decimal::from(24)
    }

    /// 24h volume over liquidity. `None` when the pool is empty.
    pub fn turnover(&self) -> Option<Decimal> {
        if self.liquidity_usd.is_zero() {
            return None;
        }
        Some(self.volume_24h_usd / self.liquidity_usd)
    }
}
