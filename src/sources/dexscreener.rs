use std::collections::HashSet;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use metrics::counter;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use super::{FetchError, Fetcher, MalformedRecord};
use crate::models::{PriceChange, RawPairSnapshot};

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DexPair {
    chain_id: Option<String>,
    pair_address: Option<String>,
    url: Option<String>,
    base_token: Option<DexToken>,
    quote_token: Option<DexToken>,
    price_usd: Option<Decimal>,
    txns: Option<DexTxns>,
    volume: Option<DexWindow>,
    price_change: Option<DexWindow>,
    liquidity: Option<DexLiquidity>,
    /// Milliseconds since epoch.
    pair_created_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct DexToken {
    symbol: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DexTxns {
    h24: Option<DexTxnCount>,
}

#[derive(Debug, Deserialize)]
struct DexTxnCount {
    buys: Option<u64>,
    sells: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct DexWindow {
    m5: Option<Decimal>,
    h1: Option<Decimal>,
    h24: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct DexLiquidity {
    usd: Option<Decimal>,
}

impl DexPair {
    fn into_snapshot(self, now: DateTime<Utc>) -> Result<RawPairSnapshot, MalformedRecord> {
        let id = self.pair_address.clone().unwrap_or_else(|| "<unknown>".into());
        let missing = |field: &str| MalformedRecord::new("pair", id.clone(), format!("missing {field}"));

        let chain_id = self.chain_id.ok_or_else(|| missing("chainId"))?;
        let pair_address = self.pair_address.ok_or_else(|| missing("pairAddress"))?;
        let base_symbol = self
            .base_token
            .and_then(|t| t.symbol)
            .ok_or_else(|| missing("baseToken.symbol"))?;
        let quote_symbol = self
            .quote_token
            .and_then(|t| t.symbol)
            .ok_or_else(|| missing("quoteToken.symbol"))?;
        let liquidity_usd = self
            .liquidity
            .and_then(|l| l.usd)
            .ok_or_else(|| missing("liquidity.usd"))?;
        let price_usd = self.price_usd.ok_or_else(|| missing("priceUsd"))?;
        let volume = self.volume.ok_or_else(|| missing("volume"))?;
        let volume_24h_usd = volume.h24.ok_or_else(|| missing("volume.h24"))?;

        let price_change = self
            .price_change
            .map(|pc| PriceChange {
                m5: pc.m5.unwrap_or_default(),
                h1: pc.h1.unwrap_or_default(),
                h24: pc.h24.unwrap_or_default(),
            })
            .unwrap_or_default();

        let (buys_24h, sells_24h) = self
            .txns
            .and_then(|t| t.h24)
            .map(|c| (c.buys.unwrap_or(0), c.sells.unwrap_or(0)))
            .unwrap_or((0, 0));

        // Unknown creation time counts as brand new
        let pair_age_hours = self
            .pair_created_at
            .map(|created_ms| {
                let age_ms = (now.timestamp_millis() - created_ms).max(0);
                Decimal::from(age_ms) / Decimal::from(3_600_000)
            })
            .unwrap_or(Decimal::ZERO);

        Ok(RawPairSnapshot {
            chain_id,
            pair_address,
            base_symbol: base_symbol.to_uppercase(),
            quote_symbol: quote_symbol.to_uppercase(),
            liquidity_usd,
            volume_24h_usd,
            volume_1h_usd: volume.h1.unwrap_or_default(),
            price_usd,
            price_change,
            buys_24h,
            sells_24h,
            pair_age_hours,
            pair_url: self.url.unwrap_or_default(),
        })
    }
}

/// Parse a search response body into snapshots for `chain_id`.
/// Malformed records are skipped and counted.
pub fn parse_pairs(
    body: &Value,
    chain_id: &str,
    now: DateTime<Utc>,
) -> (Vec<RawPairSnapshot>, usize) {
    let Some(raw_pairs) = body.get("pairs").and_then(Value::as_array) else {
        return (Vec::new(), 0);
    };

    let mut pairs = Vec::with_capacity(raw_pairs.len());
    let mut malformed = 0;

    for raw in raw_pairs {
        let parsed = serde_json::from_value::<DexPair>(raw.clone())
            .map_err(|e| MalformedRecord::new("pair", "<undecodable>", e.to_string()))
            .and_then(|p| p.into_snapshot(now));

        match parsed {
            Ok(snapshot) if snapshot.chain_id.eq_ignore_ascii_case(chain_id) => pairs.push(snapshot),
            Ok(_) => {}
            Err(e) => {
                malformed += 1;
                tracing::debug!(error = %e, "Skipping DEX pair");
            }
        }
    }

    (pairs, malformed)
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DexClient {
    fetcher: Fetcher,
    base_url: String,
}

impl DexClient {
    pub fn new(fetcher: Fetcher, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
        }
    }

    pub async fn search(&self, query: &str) -> Result<Value, FetchError> {
        let url = format!("{}/latest/dex/search", self.base_url);
        self.fetcher.get(&url, &[("q", query)]).await
    }

    /// Run every keyword search for `target` concurrently and merge the
    /// results, deduplicated by pair address. Fails only if every search failed.
    pub async fn scan_target(
        &self,
        target: &str,
        keywords: &[String],
        now: DateTime<Utc>,
    ) -> Result<Vec<RawPairSnapshot>, FetchError> {
        let queries: Vec<&str> = if keywords.is_empty() {
            vec![target]
        } else {
            keywords.iter().map(String::as_str).collect()
        };

        let responses = join_all(queries.iter().map(|q| self.search(q))).await;

        let mut seen = HashSet::new();
        let mut pairs = Vec::new();
        let mut first_error = None;
        let mut any_ok = false;

        for (query, response) in queries.iter().zip(responses) {
            match response {
                Ok(body) => {
                    any_ok = true;
                    let (parsed, malformed) = parse_pairs(&body, target, now);
                    if malformed > 0 {
                        counter!("malformed_records_total").increment(malformed as u64);
                        tracing::warn!(scan_target = target, query, malformed, "Skipped malformed DEX pairs");
                    }
                    for pair in parsed {
                        if seen.insert(pair.pair_address.clone()) {
                            pairs.push(pair);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(scan_target = target, query, error = %e, "DEX search failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) if !any_ok => Err(e),
            _ => Ok(pairs),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
