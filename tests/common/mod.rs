use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde_json::{json, Value};

use capflow::config::{AppConfig, Endpoints};

/// 2025-01-01T00:00:00Z
const DAY0: i64 = 1_735_689_600;

/// Canned upstream responses keyed by route name. A missing key answers 503.
#[derive(Clone, Default)]
pub struct Fixtures(HashMap<&'static str, Value>);

#[allow(dead_code)]
impl Fixtures {
    /// A market where Solana pulls in $25M over the day with negative SOL
    /// funding, and SOL trades at $150.
    pub fn bullish_solana() -> Self {
        let tvl: Vec<Value> = [
            8_000_000_000i64,
            8_010_000_000,
            8_020_000_000,
            8_030_000_000,
            8_040_000_000,
            8_050_000_000,
            8_060_000_000,
            8_085_000_000,
        ]
        .iter()
        .enumerate()
        .map(|(i, tvl)| json!({ "date": DAY0 + i as i64 * 86_400, "tvl": tvl }))
        .collect();

        let mut map = HashMap::new();
        map.insert("dex", json!({ "pairs": [sol_usdc_pair()] }));
        map.insert("tvl", Value::Array(tvl));
        map.insert("protocol", json!({ "tokensInUsd": [] }));
        map.insert(
            "stablecoins",
            json!([
                { "name": "Solana", "totalCirculatingUSD": { "peggedUSD": 2_000_000_000i64 } },
                { "name": "Ethereum", "totalCirculatingUSD": { "peggedUSD": 90_000_000_000i64 } }
            ]),
        );
        map.insert(
            "funding",
            json!([
                { "symbol": "BTCUSDT", "lastFundingRate": "0.00010000" },
                { "symbol": "SOLUSDT", "lastFundingRate": "-0.00010000" }
            ]),
        );
        map.insert(
            "fear_greed",
            json!({ "data": [{ "value": "20" }, { "value": "35" }] }),
        );
        map.insert(
            "prices",
            json!([
                { "symbol": "BTCUSDT", "price": "97000.00" },
                { "symbol": "SOLUSDT", "price": "150.00" },
                { "symbol": "ETHBTC", "price": "0.035" }
            ]),
        );
        Self(map)
    }

    pub fn without(mut self, route: &'static str) -> Self {
        self.0.remove(route);
        self
    }

    pub fn with(mut self, route: &'static str, body: Value) -> Self {
        self.0.insert(route, body);
        self
    }

    fn respond(&self, route: &'static str) -> Response {
        match self.0.get(route) {
            Some(body) => Json(body.clone()).into_response(),
            None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        }
    }
}

fn sol_usdc_pair() -> Value {
    json!({
        "chainId": "solana",
        "pairAddress": "8sLbNZoA1cfnvMJLPfp98ZLAnFSYCFApfJKMbiXNLwxj",
        "url": "https://dexscreener.com/solana/8slbnzoa1cfnvmjlpfp98zlanfsycfapfjkmbixnlwxj",
        "baseToken": { "symbol": "SOL" },
        "quoteToken": { "symbol": "USDC" },
        "priceUsd": "150.00",
        "txns": { "h24": { "buys": 5200, "sells": 4100 } },
        "volume": { "h24": 42000000, "h1": 1800000 },
        "priceChange": { "m5": 0.1, "h1": 0.6, "h24": 3.2 },
        "liquidity": { "usd": 12000000 },
        "pairCreatedAt": 1_650_000_000_000i64
    })
}

/// Serve `fixtures` on an ephemeral port. Returns the base URL.
#[allow(dead_code)]
pub async fn spawn_upstream(fixtures: Fixtures) -> String {
    let shared = Arc::new(fixtures);

    let router = Router::new()
        .route("/latest/dex/search", get(|State(f): State<Arc<Fixtures>>| async move { f.respond("dex") }))
        .route(
            "/v2/historicalChainTvl/:chain",
            get(|State(f): State<Arc<Fixtures>>| async move { f.respond("tvl") }),
        )
        .route("/protocol/:slug", get(|State(f): State<Arc<Fixtures>>| async move { f.respond("protocol") }))
        .route("/stablecoinchains", get(|State(f): State<Arc<Fixtures>>| async move { f.respond("stablecoins") }))
        .route("/fapi/v1/premiumIndex", get(|State(f): State<Arc<Fixtures>>| async move { f.respond("funding") }))
        .route("/fng/", get(|State(f): State<Arc<Fixtures>>| async move { f.respond("fear_greed") }))
        .route("/api/v3/ticker/price", get(|State(f): State<Arc<Fixtures>>| async move { f.respond("prices") }))
        .with_state(shared);

    serve(router).await
}

/// Bind `router` to 127.0.0.1 on a random port and serve it in the background.
#[allow(dead_code)]
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("listener has an address");

    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    format!("http://{addr}")
}

/// Config pointing every upstream at `base` and persisting under `data_dir`.
/// One attempt per request so failing sources don't slow the tests down.
#[allow(dead_code)]
pub fn test_config(base: &str, data_dir: PathBuf) -> AppConfig {
    AppConfig {
        host: "127.0.0.1".into(),
        port: 0,
        cycle_interval_secs: 3_600,
        data_dir,
        taxonomy_path: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config/taxonomy.json"),
        thresholds_path: None,
        scan_targets: vec!["solana".into()],
        tvl_chains: vec!["Solana".into()],
        exchanges: vec!["binance-cex".into()],
        fetch_max_retries: 1,
        fetch_base_delay: Duration::from_millis(10),
        fetch_timeout: Duration::from_secs(5),
        initial_capital: Decimal::from(10_000),
        endpoints: Endpoints::all(base),
    }
}
