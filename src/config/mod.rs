use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::intelligence::flow_classifier::WashTradeFilter;
use crate::intelligence::signals::SignalThresholds;
use crate::intelligence::whale_detector::WhaleGates;
use crate::sources::fetcher::RetryPolicy;

const DEFAULT_DEXSCREENER_URL: &str = "https://api.dexscreener.com";
const DEFAULT_LLAMA_URL: &str = "https://api.llama.fi";
const DEFAULT_STABLECOINS_URL: &str = "https://stablecoins.llama.fi";
const DEFAULT_BINANCE_FUTURES_URL: &str = "https://fapi.binance.com";
const DEFAULT_BINANCE_SPOT_URL: &str = "https://api.binance.com";
const DEFAULT_FEAR_GREED_URL: &str = "https://api.alternative.me";

/// Upstream base URLs. Overridable so tests can point at a local server.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub dexscreener: String,
    pub llama: String,
    pub stablecoins: String,
    pub binance_futures: String,
    pub binance_spot: String,
    pub fear_greed: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            dexscreener: DEFAULT_DEXSCREENER_URL.into(),
            llama: DEFAULT_LLAMA_URL.into(),
            stablecoins: DEFAULT_STABLECOINS_URL.into(),
            binance_futures: DEFAULT_BINANCE_FUTURES_URL.into(),
            binance_spot: DEFAULT_BINANCE_SPOT_URL.into(),
            fear_greed: DEFAULT_FEAR_GREED_URL.into(),
        }
    }
}

impl Endpoints {
    /// Every upstream served from one base URL (test servers).
    pub fn all(base: &str) -> Self {
        Self {
            dexscreener: base.into(),
            llama: base.into(),
            stablecoins: base.into(),
            binance_futures: base.into(),
            binance_spot: base.into(),
            fear_greed: base.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,

    // Cycle
    pub cycle_interval_secs: u64,
    pub data_dir: PathBuf,
    pub taxonomy_path: PathBuf,
    pub thresholds_path: Option<PathBuf>,

    // What to scan
    pub scan_targets: Vec<String>,
    pub tvl_chains: Vec<String>,
    pub exchanges: Vec<String>,

    // Fetch policy
    pub fetch_max_retries: u32,
    pub fetch_base_delay: Duration,
    pub fetch_timeout: Duration,

    // Paper treasury
    pub initial_capital: Decimal,

    pub endpoints: Endpoints,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let endpoints = Endpoints {
            dexscreener: env::var("DEXSCREENER_URL")
                .unwrap_or_else(|_| DEFAULT_DEXSCREENER_URL.into()),
            llama: env::var("LLAMA_URL").unwrap_or_else(|_| DEFAULT_LLAMA_URL.into()),
            stablecoins: env::var("STABLECOINS_URL")
                .unwrap_or_else(|_| DEFAULT_STABLECOINS_URL.into()),
            binance_futures: env::var("BINANCE_FUTURES_URL")
                .unwrap_or_else(|_| DEFAULT_BINANCE_FUTURES_URL.into()),
            binance_spot: env::var("BINANCE_SPOT_URL")
                .unwrap_or_else(|_| DEFAULT_BINANCE_SPOT_URL.into()),
            fear_greed: env::var("FEAR_GREED_URL")
                .unwrap_or_else(|_| DEFAULT_FEAR_GREED_URL.into()),
        };

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,

            cycle_interval_secs: env::var("CYCLE_INTERVAL_SECS")
                .unwrap_or_else(|_| "900".into())
                .parse()?,
            data_dir: env::var("DATA_DIR")
                .unwrap_or_else(|_| "data".into())
                .into(),
            taxonomy_path: env::var("TAXONOMY_PATH")
                .unwrap_or_else(|_| "config/taxonomy.json".into())
                .into(),
            thresholds_path: env::var("THRESHOLDS_PATH").ok().map(PathBuf::from),

            scan_targets: list_var("SCAN_TARGETS", "ethereum,solana,bsc,base,arbitrum"),
            tvl_chains: list_var(
                "TVL_CHAINS",
                "Ethereum,Solana,BSC,Base,Arbitrum,Tron,Avalanche,Sui",
            ),
            exchanges: list_var(
                "EXCHANGES",
                "binance-cex,okx,bybit,bitfinex,coinbase,kraken,gate-io,kucoin",
            ),

            fetch_max_retries: env::var("FETCH_MAX_RETRIES")
                .unwrap_or_else(|_| "3".into())
                .parse()
                .unwrap_or(3),
            fetch_base_delay: Duration::from_millis(
                env::var("FETCH_BASE_DELAY_MS")
                    .unwrap_or_else(|_| "2000".into())
                    .parse()
                    .unwrap_or(2_000),
            ),
            fetch_timeout: Duration::from_secs(
                env::var("FETCH_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "30".into())
                    .parse()
                    .unwrap_or(30),
            ),

            initial_capital: env::var("INITIAL_CAPITAL")
                .unwrap_or_else(|_| "10000".into())
                .parse()
                .unwrap_or(Decimal::from(10_000)),

            endpoints,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.fetch_max_retries,
            base_delay: self.fetch_base_delay,
            ..RetryPolicy::default()
        }
    }
}

fn list_var(key: &str, default: &str) -> Vec<String> {
    env::var(key)
        .unwrap_or_else(|_| default.into())
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Empirical screening/scoring thresholds. Every field defaults to the
/// production value, so a thresholds file only needs the overrides.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub wash: WashTradeFilter,
    pub whale: WhaleGates,
    pub signals: SignalThresholds,
}

impl Thresholds {
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Load overrides from `path`, or defaults when no path is configured.
    pub async fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => {
                let raw = tokio::fs::read_to_string(p).await?;
                Self::from_json(&raw)
            }
            None => Ok(Self::default()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
