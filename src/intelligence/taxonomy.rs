use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::models::FlowCategory;

#[derive(Debug, Error)]
pub enum TaxonomyError {
    #[error("failed to read taxonomy file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid taxonomy: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct TaxonomyFile {
    native_tokens: Vec<String>,
    stablecoins: Vec<String>,
    btc_tokens: Vec<String>,
    #[serde(default)]
    stablecoin_substring: String,
    #[serde(default)]
    major_assets: Vec<String>,
    #[serde(default)]
    chain_native: HashMap<String, String>,
    #[serde(default)]
    chain_tradable: HashMap<String, String>,
    #[serde(default)]
    dex_keywords: HashMap<String, Vec<String>>,
    #[serde(default)]
    tier1_exchanges: Vec<String>,
}

/// Symbol and venue lookup tables, loaded from a JSON asset so they can be
/// updated without a rebuild. Symbols are stored uppercase, chains and
/// exchange slugs lowercase.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    native: HashSet<String>,
    stablecoins: HashSet<String>,
    btc: HashSet<String>,
    stablecoin_substring: String,
    major_assets: HashSet<String>,
    chain_native: HashMap<String, String>,
    chain_tradable: HashMap<String, String>,
    dex_keywords: HashMap<String, Vec<String>>,
    tier1_exchanges: HashSet<String>,
}

fn upper_set(items: Vec<String>) -> HashSet<String> {
    items.into_iter().map(|s| s.trim().to_uppercase()).collect()
}

fn lower_keys(map: HashMap<String, String>) -> HashMap<String, String> {
    map.into_iter()
        .map(|(k, v)| (k.trim().to_lowercase(), v.trim().to_uppercase()))
        .collect()
}

impl Taxonomy {
    pub fn from_json(raw: &str) -> Result<Self, TaxonomyError> {
        let file: TaxonomyFile = serde_json::from_str(raw)?;

        Ok(Self {
            native: upper_set(file.native_tokens),
            stablecoins: upper_set(file.stablecoins),
            btc: upper_set(file.btc_tokens),
            stablecoin_substring: file.stablecoin_substring.trim().to_uppercase(),
            major_assets: upper_set(file.major_assets),
            chain_native: lower_keys(file.chain_native),
            chain_tradable: lower_keys(file.chain_tradable),
            dex_keywords: file
                .dex_keywords
                .into_iter()
                .map(|(k, v)| (k.to_lowercase(), v))
                .collect(),
            tier1_exchanges: file
                .tier1_exchanges
                .into_iter()
                .map(|s| s.to_lowercase())
                .collect(),
        })
    }

    pub async fn load(path: &Path) -> Result<Self, TaxonomyError> {
        let raw = tokio::fs::read_to_string(path).await?;
        let taxonomy = Self::from_json(&raw)?;
        tracing::info!(
            path = %path.display(),
            native = taxonomy.native.len(),
            stablecoins = taxonomy.stablecoins.len(),
            btc = taxonomy.btc.len(),
            "Taxonomy loaded"
        );
        Ok(taxonomy)
    }

    /// Exact table match first, then the stablecoin substring fallback.
    pub fn classify(&self, symbol: &str) -> FlowCategory {
        let symbol = symbol.trim().to_uppercase();

        if self.native.contains(&symbol) {
            FlowCategory::Native
        } else if self.stablecoins.contains(&symbol) {
            FlowCategory::Stablecoin
        } else if self.btc.contains(&symbol) {
            FlowCategory::Btc
        } else if self.matches_stable_substring(&symbol) {
            FlowCategory::Stablecoin
        } else {
            FlowCategory::Altcoin
        }
    }

    pub fn is_stablecoin(&self, symbol: &str) -> bool {
        let symbol = symbol.trim().to_uppercase();
        self.stablecoins.contains(&symbol) || self.matches_stable_substring(&symbol)
    }

    fn matches_stable_substring(&self, upper: &str) -> bool {
        !self.stablecoin_substring.is_empty() && upper.contains(&self.stablecoin_substring)
    }

    /// BTC/ETH and their wrapped or staked forms.
    pub fn is_major(&self, symbol: &str) -> bool {
        self.major_assets.contains(&symbol.trim().to_uppercase())
    }

    pub fn native_symbol(&self, chain: &str) -> Option<&str> {
        self.chain_native
            .get(&chain.trim().to_lowercase())
            .map(String::as_str)
    }

    /// Spot symbol used to express a view on `chain`.
    pub fn tradable_symbol(&self, chain: &str) -> Option<&str> {
        self.chain_tradable
            .get(&chain.trim().to_lowercase())
            .map(String::as_str)
    }

    pub fn dex_keywords(&self, target: &str) -> &[String] {
        self.dex_keywords
            .get(&target.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_tier1(&self, exchange: &str) -> bool {
        self.tier1_exchanges.contains(&exchange.to_lowercase())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) fn bundled() -> Taxonomy {
    Taxonomy::from_json(include_str!("../../config/taxonomy.json"))
        .expect("bundled taxonomy must parse")
}
