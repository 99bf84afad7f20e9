use std::collections::HashMap;

use rust_decimal::Decimal;
use serde_json::Value;

use super::{decimal_value, FetchError, Fetcher, MalformedRecord};
use crate::models::FearGreed;

/// Binance derivatives/spot and the alternative.me fear & greed index.
#[derive(Debug, Clone)]
pub struct MarketClient {
    fetcher: Fetcher,
    futures_url: String,
    spot_url: String,
    fear_greed_url: String,
}

impl MarketClient {
    pub fn new(
        fetcher: Fetcher,
        futures_url: impl Into<String>,
        spot_url: impl Into<String>,
        fear_greed_url: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            futures_url: futures_url.into(),
            spot_url: spot_url.into(),
            fear_greed_url: fear_greed_url.into(),
        }
    }

    /// Latest funding rate of every USDT perp, in percent, keyed by base symbol.
    pub async fn funding_rates(&self) -> Result<HashMap<String, Decimal>, FetchError> {
        let url = format!("{}/fapi/v1/premiumIndex", self.futures_url);
        let body = self.fetcher.get(&url, &[]).await?;
        Ok(parse_funding_rates(&body))
    }

    /// Today's index and yesterday's, for change detection.
    pub async fn fear_greed(&self) -> Result<FearGreed, FetchError> {
        let url = format!("{}/fng/", self.fear_greed_url);
        let body = self.fetcher.get(&url, &[("limit", "2")]).await?;
        parse_fear_greed(&body).map_err(|e| FetchError::Decode {
            url,
            reason: e.to_string(),
        })
    }

    /// Spot USD price of every USDT pair, keyed by base symbol.
    pub async fn spot_prices(&self) -> Result<HashMap<String, Decimal>, FetchError> {
        let url = format!("{}/api/v3/ticker/price", self.spot_url);
        let body = self.fetcher.get(&url, &[]).await?;
        Ok(parse_spot_prices(&body))
    }
}

fn usdt_base(symbol: &str) -> Option<&str> {
    symbol.strip_suffix("USDT").filter(|base| !base.is_empty())
}

/// Binance reports funding as a fraction (0.0001); convert to percent (0.01).
pub fn parse_funding_rates(body: &Value) -> HashMap<String, Decimal> {
    body.as_array()
        .map(|rows| {
            rows.iter()
                .filter_map(|row| {
                    let base = usdt_base(row.get("symbol")?.as_str()?)?;
                    let rate = decimal_value(row.get("lastFundingRate")?)?;
                    Some((base.to_string(), rate * Decimal::ONE_HUNDRED))
                })
                .collect()
        })
        .unwrap_or_default()
}

pub fn parse_spot_prices(body: &Value) -> HashMap<String, Decimal> {
    body.as_array()
        .map(|rows| {
            rows.iter()
                .filter_map(|row| {
                    let base = usdt_base(row.get("symbol")?.as_str()?)?;
                    let price = decimal_value(row.get("price")?)?;
                    Some((base.to_string(), price))
                })
                .filter(|(_, price)| *price > Decimal::ZERO)
                .collect()
        })
        .unwrap_or_default()
}

pub fn parse_fear_greed(body: &Value) -> Result<FearGreed, MalformedRecord> {
    let entries = body
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| MalformedRecord::new("fear_greed", "data", "missing data array"))?;

    let index_at = |i: usize| -> Option<u8> {
        let v = entries.get(i)?.get("value")?;
        let n = match v {
            Value::String(s) => s.trim().parse::<u64>().ok()?,
            other => other.as_u64()?,
        };
        u8::try_from(n.min(100)).ok()
    };

    let value = index_at(0)
        .ok_or_else(|| MalformedRecord::new("fear_greed", "data[0]", "missing value"))?;

    Ok(FearGreed {
        value,
        previous: index_at(1),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
