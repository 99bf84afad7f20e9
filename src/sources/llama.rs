use std::collections::{BTreeMap, HashMap};

use metrics::counter;
use rust_decimal::Decimal;
use serde_json::Value;

use super::{decimal_value, timestamp_value, FetchError, Fetcher};
use crate::models::{BalanceSnapshot, TvlPoint};

/// DefiLlama TVL and stablecoin endpoints.
#[derive(Debug, Clone)]
pub struct LlamaClient {
    fetcher: Fetcher,
    base_url: String,
    stablecoins_url: String,
}

impl LlamaClient {
    pub fn new(
        fetcher: Fetcher,
        base_url: impl Into<String>,
        stablecoins_url: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
            stablecoins_url: stablecoins_url.into(),
        }
    }

    /// Daily TVL history for one chain, oldest first.
    pub async fn chain_tvl_history(&self, chain: &str) -> Result<Vec<TvlPoint>, FetchError> {
        let url = format!("{}/v2/historicalChainTvl/{}", self.base_url, chain);
        let body = self.fetcher.get(&url, &[]).await?;
        Ok(parse_tvl_history(&body))
    }

    /// Per-token balance history of an exchange (`tokensInUsd`), oldest first.
    pub async fn exchange_balances(&self, slug: &str) -> Result<Vec<BalanceSnapshot>, FetchError> {
        let url = format!("{}/protocol/{}", self.base_url, slug);
        let body = self.fetcher.get(&url, &[]).await?;
        Ok(parse_token_balances(&body))
    }

    /// Circulating USD-pegged supply per chain, keyed by lowercase chain name.
    pub async fn stablecoin_supply(&self) -> Result<HashMap<String, Decimal>, FetchError> {
        let url = format!("{}/stablecoinchains", self.stablecoins_url);
        let body = self.fetcher.get(&url, &[]).await?;
        Ok(parse_stablecoin_chains(&body))
    }
}

pub fn parse_tvl_history(body: &Value) -> Vec<TvlPoint> {
    let Some(rows) = body.as_array() else {
        return Vec::new();
    };

    let mut points: Vec<TvlPoint> = rows
        .iter()
        .filter_map(|row| {
            Some(TvlPoint {
                date: timestamp_value(row.get("date")?)?,
                tvl_usd: decimal_value(row.get("tvl")?)?,
            })
        })
        .collect();

    let skipped = rows.len() - points.len();
    if skipped > 0 {
        counter!("malformed_records_total").increment(skipped as u64);
        tracing::debug!(skipped, "Skipped malformed TVL points");
    }

    points.sort_by_key(|p| p.date);
    points
}

pub fn parse_token_balances(body: &Value) -> Vec<BalanceSnapshot> {
    let Some(rows) = body.get("tokensInUsd").and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut snapshots: Vec<BalanceSnapshot> = rows
        .iter()
        .filter_map(|row| {
            let date = timestamp_value(row.get("date")?)?;
            let tokens: BTreeMap<String, Decimal> = row
                .get("tokens")?
                .as_object()?
                .iter()
                .filter_map(|(symbol, v)| Some((symbol.to_uppercase(), decimal_value(v)?)))
                .collect();
            Some(BalanceSnapshot { date, tokens })
        })
        .collect();

    snapshots.sort_by_key(|s| s.date);
    snapshots
}

pub fn parse_stablecoin_chains(body: &Value) -> HashMap<String, Decimal> {
    body.as_array()
        .map(|rows| {
            rows.iter()
                .filter_map(|row| {
                    let name = row.get("name")?.as_str()?.to_lowercase();
                    let supply = decimal_value(row.get("totalCirculatingUSD")?.get("peggedUSD")?)?;
                    Some((name, supply))
                })
                .collect()
        })
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_tvl_history_sorts_and_skips_bad_rows() {
        let body = json!([
            { "date": 1_700_086_400, "tvl": 1_100_000_000.5 },
            { "date": 1_700_000_000, "tvl": 1_000_000_000 },
            { "date": "bad", "tvl": 5 },
            { "tvl": 5 },
        ]);
        let points = parse_tvl_history(&body);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].tvl_usd, Decimal::from(1_000_000_000));
        assert_eq!(points[1].tvl_usd, Decimal::new(11_000_000_005, 1));
    }

    #[test]
    fn test_parse_token_balances() {
        let body = json!({
            "name": "Binance CEX",
            "tokensInUsd": [
                { "date": 1_700_086_400, "tokens": { "USDT": 2_000, "btc": 500 } },
                { "date": 1_700_000_000, "tokens": { "USDT": 1_000, "BTC": "400" } },
            ]
        });
        let snaps = parse_token_balances(&body);
        assert_eq!(snaps.len(), 2);
        assert_eq!(snaps[0].tokens["USDT"], Decimal::from(1_000));
        assert_eq!(snaps[1].tokens["BTC"], Decimal::from(500));
    }

    #[test]
    fn test_parse_stablecoin_chains() {
        let body = json!([
            { "name": "Ethereum", "totalCirculatingUSD": { "peggedUSD": 90_000_000_000u64 } },
            { "name": "Tron", "totalCirculatingUSD": { "peggedEUR": 1 } },
        ]);
        let supply = parse_stablecoin_chains(&body);
        assert_eq!(supply.len(), 1);
        assert_eq!(supply["ethereum"], Decimal::from(90_000_000_000u64));
    }
}
