use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FearGreed {
    pub value: u8,
    pub previous: Option<u8>,
}

/// External macro inputs shared by every opportunity in a cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketIndicators {
    /// Perp funding in percent per interval, keyed by base symbol (BTC, ETH, ...).
    pub funding_rates_pct: HashMap<String, Decimal>,
    pub fear_greed: Option<FearGreed>,
    /// Spot USD price keyed by base symbol.
    pub spot_prices: HashMap<String, Decimal>,
}

impl MarketIndicators {
    pub fn funding(&self, symbol: &str) -> Option<Decimal> {
        self.funding_rates_pct.get(&symbol.to_uppercase()).copied()
    }

    pub fn btc_funding(&self) -> Option<Decimal> {
        self.funding("BTC")
    }

    /// Funding for `symbol`, falling back to BTC as the market-wide proxy.
    pub fn funding_or_btc(&self, symbol: Option<&str>) -> Option<Decimal> {
        symbol.and_then(|s| self.funding(s)).or_else(|| self.btc_funding())
    }

    pub fn fear_greed_value(&self) -> Option<u8> {
        self.fear_greed.map(|fg| fg.value)
    }

    pub fn price(&self, symbol: &str) -> Option<Decimal> {
        self.spot_prices.get(&symbol.to_uppercase()).copied()
    }
}
