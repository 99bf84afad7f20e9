pub mod dexscreener;
pub mod fetcher;
pub mod llama;
pub mod market;

pub use dexscreener::DexClient;
pub use fetcher::{FetchError, Fetcher, RetryPolicy};
pub use llama::LlamaClient;
pub use market::MarketClient;

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use thiserror::Error;

/// A single upstream record that lacks a required field. Skipped on its own;
/// never fails the batch it arrived in.
#[derive(Debug, Error)]
#[error("malformed {kind} record {id}: {reason}")]
pub struct MalformedRecord {
    pub kind: &'static str,
    pub id: String,
    pub reason: String,
}

impl MalformedRecord {
    pub fn new(kind: &'static str, id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            reason: reason.into(),
        }
    }
}

/// Read a JSON number or numeric string as a Decimal.
pub(crate) fn decimal_value(v: &Value) -> Option<Decimal> {
    match v {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Some(Decimal::from(i));
            }
            parse_decimal(&n.to_string())
        }
        Value::String(s) => parse_decimal(s.trim()),
        _ => None,
    }
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

/// Unix seconds, as a number or a numeric string.
pub(crate) fn timestamp_value(v: &Value) -> Option<DateTime<Utc>> {
    let secs = match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    DateTime::from_timestamp(secs, 0)
}
