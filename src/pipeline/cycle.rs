use std::collections::{HashMap, HashSet};
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use metrics::{counter, histogram};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{AppConfig, Thresholds};
use crate::execution::{
    adapt_weights, run_paper_trading, AdaptOutcome, TradingActivity, TreasuryState,
    TreasurySummary,
};
use crate::intelligence::{
    analyze_chain, analyze_exchange, chain_opportunities, classify_flows, composite_sentiment,
    detect_accumulation, exchange_opportunities, macro_outlook, rank_opportunities, run_debates,
    screen_pairs, smart_money_flow, total_stable_inflow, MacroOutlook, SentimentInputs,
    SentimentScore, Taxonomy,
};
use crate::models::{
    AccumulationCandidate, AgentWeights, BalanceSnapshot, ChainFlow, ExchangeFlow, FlowBreakdown,
    MarketIndicators, Opportunity, PaperPosition, RawPairSnapshot, TvlPoint,
};
use crate::sources::{DexClient, FetchError, Fetcher, LlamaClient, MarketClient};
use crate::store::documents::{load_trading_state, save_trading_state, TradingState};
use crate::store::{DocumentStore, Versioned};

/// Everything a cycle needs, built once at startup.
pub struct CycleContext {
    pub config: AppConfig,
    pub taxonomy: Taxonomy,
    pub thresholds: Thresholds,
    pub store: DocumentStore,
    dex: DexClient,
    llama: LlamaClient,
    market: MarketClient,
}

impl CycleContext {
    pub fn new(
        config: AppConfig,
        taxonomy: Taxonomy,
        thresholds: Thresholds,
    ) -> Result<Self, FetchError> {
        let fetcher = Fetcher::new(config.fetch_timeout, config.retry_policy())?;
        let endpoints = &config.endpoints;

        Ok(Self {
            dex: DexClient::new(fetcher.clone(), endpoints.dexscreener.clone()),
            llama: LlamaClient::new(
                fetcher.clone(),
                endpoints.llama.clone(),
                endpoints.stablecoins.clone(),
            ),
            market: MarketClient::new(
                fetcher,
                endpoints.binance_futures.clone(),
                endpoints.binance_spot.clone(),
                endpoints.fear_greed.clone(),
            ),
            store: DocumentStore::new(config.data_dir.clone()),
            config,
            taxonomy,
            thresholds,
        })
    }

    /// Load the taxonomy and thresholds named by `config` and prepare the
    /// data directory.
    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let taxonomy = Taxonomy::load(&config.taxonomy_path).await?;
        let thresholds = Thresholds::load(config.thresholds_path.as_deref()).await?;
        let ctx = Self::new(config, taxonomy, thresholds)?;
        ctx.store.init().await?;
        Ok(ctx)
    }
}

/// Output of one cycle, handed to the API and any renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub opportunities: Vec<Opportunity>,
    pub flows: Vec<FlowBreakdown>,
    pub whales: Vec<AccumulationCandidate>,
    pub chains: Vec<ChainFlow>,
    pub exchanges: Vec<ExchangeFlow>,
    pub indicators: MarketIndicators,
    pub sentiment: SentimentScore,
    pub macro_outlook: MacroOutlook,
    pub weights: AgentWeights,
    pub weight_update: AdaptOutcome,
    pub treasury: TreasurySummary,
    pub positions: Vec<PaperPosition>,
    pub trading: TradingActivity,
    /// Sources that failed this cycle and contributed nothing.
    pub unavailable_sources: Vec<String>,
    /// False when the trading documents could not be loaded or saved.
    pub persisted: bool,
}

/// Raw inputs of a cycle, all from the same fetch generation.
#[derive(Debug, Default)]
struct Snapshot {
    pairs: Vec<(String, Vec<RawPairSnapshot>)>,
    tvl: Vec<(String, Vec<TvlPoint>)>,
    stable_supply: HashMap<String, Decimal>,
    balances: Vec<(String, Vec<BalanceSnapshot>)>,
    indicators: MarketIndicators,
    unavailable: Vec<String>,
}

impl Snapshot {
    /// Unwrap a source result, degrading a failure to empty data.
    fn take<T: Default>(&mut self, source: String, result: Result<T, FetchError>) -> T {
        match result {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(source = %source, error = %e, "Source unavailable");
                counter!("sources_unavailable_total").increment(1);
                self.unavailable.push(source);
                T::default()
            }
        }
    }
}

/// Fan out every fetch of the cycle and wait for all of them.
async fn fetch_snapshot(ctx: &CycleContext, now: DateTime<Utc>) -> Snapshot {
    let cfg = &ctx.config;

    let dex = join_all(cfg.scan_targets.iter().map(|target| {
        ctx.dex
            .scan_target(target, ctx.taxonomy.dex_keywords(target), now)
    }));
    let tvl = join_all(cfg.tvl_chains.iter().map(|c| ctx.llama.chain_tvl_history(c)));
    let balances = join_all(cfg.exchanges.iter().map(|e| ctx.llama.exchange_balances(e)));

    let (dex, tvl, balances, stable_supply, funding, fear_greed, spot) = tokio::join!(
        dex,
        tvl,
        balances,
        ctx.llama.stablecoin_supply(),
        ctx.market.funding_rates(),
        ctx.market.fear_greed(),
        ctx.market.spot_prices(),
    );

    let mut snap = Snapshot::default();

    for (target, result) in cfg.scan_targets.iter().zip(dex) {
        let pairs = snap.take(format!("dex:{target}"), result);
        snap.pairs.push((target.clone(), pairs));
    }
    for (chain, result) in cfg.tvl_chains.iter().zip(tvl) {
        let history = snap.take(format!("tvl:{chain}"), result);
        snap.tvl.push((chain.clone(), history));
    }
    for (exchange, result) in cfg.exchanges.iter().zip(balances) {
        let history = snap.take(format!("exchange:{exchange}"), result);
        snap.balances.push((exchange.clone(), history));
    }
    snap.stable_supply = snap.take("stablecoins".into(), stable_supply);
    snap.indicators.funding_rates_pct = snap.take("funding".into(), funding);
    snap.indicators.spot_prices = snap.take("spot_prices".into(), spot);
    snap.indicators.fear_greed = snap.take("fear_greed".into(), fear_greed.map(Some));

    snap
}

/// Run one full cycle: fetch, classify, score, debate, trade, persist.
/// Never fails; missing sources show up in `unavailable_sources`.
pub async fn run_cycle(ctx: &CycleContext) -> CycleReport {
    let timer = Instant::now();
    let started_at = Utc::now();
    let id = Uuid::new_v4();
    tracing::info!(cycle = %id, "Cycle started");

    let snap = fetch_snapshot(ctx, started_at).await;
    let now = Utc::now();
    let t = &ctx.thresholds;
    let taxonomy = &ctx.taxonomy;

    // --- Flows and whales ---
    let mut flows = Vec::with_capacity(snap.pairs.len());
    let mut survivors: Vec<&RawPairSnapshot> = Vec::new();
    for (target, pairs) in &snap.pairs {
        let breakdown = classify_flows(target, pairs, taxonomy, &t.wash);
        counter!("pairs_discarded_total", "reason" => "below_liquidity")
            .increment(breakdown.pairs_below_liquidity as u64);
        counter!("pairs_discarded_total", "reason" => "wash_trade")
            .increment(breakdown.pairs_wash_traded as u64);
        flows.push(breakdown);
        survivors.extend(screen_pairs(pairs, &t.wash));
    }
    let whales = detect_accumulation(&survivors, taxonomy, &t.whale);
    let whale_chains: HashSet<String> = whales
        .iter()
        .map(|w| w.pair.chain_id.to_lowercase())
        .collect();

    // --- Chain and exchange capital flows ---
    let chains: Vec<ChainFlow> = snap
        .tvl
        .iter()
        .map(|(chain, history)| {
            let supply = snap.stable_supply.get(&chain.to_lowercase()).copied();
            analyze_chain(chain, history, supply)
        })
        .collect();
    let exchanges: Vec<ExchangeFlow> = snap
        .balances
        .iter()
        .map(|(exchange, history)| analyze_exchange(exchange, history, taxonomy, now))
        .collect();

    // --- Signals ---
    let indicators = snap.indicators;
    let mut opportunities = chain_opportunities(&chains, &indicators, taxonomy, &whale_chains, &t.signals);
    opportunities.extend(exchange_opportunities(&exchanges, &t.signals));
    let mut opportunities = rank_opportunities(opportunities);
    counter!("opportunities_emitted_total").increment(opportunities.len() as u64);

    let has_smart_money = exchanges.iter().any(|f| f.tier1 && f.confidence > 20);
    let has_chain_flow = chains.iter().any(|c| !c.confidence.is_low());
    let chain_stable_flow = has_chain_flow.then(|| total_stable_inflow(&chains));

    let sentiment = composite_sentiment(&SentimentInputs {
        smart_money_flow_usd: has_smart_money.then(|| smart_money_flow(&exchanges)),
        btc_funding_pct: indicators.btc_funding(),
        chain_stable_flow_usd: chain_stable_flow,
        fear_greed: indicators.fear_greed_value(),
    });
    let outlook = macro_outlook(
        indicators.fear_greed_value(),
        indicators.btc_funding(),
        chain_stable_flow,
    );

    // --- Trading state: read once, write once ---
    let (mut state, mut persisted) =
        match load_trading_state(&ctx.store, ctx.config.initial_capital).await {
            Ok(state) => (state, true),
            Err(e) => {
                tracing::error!(error = %e, "Failed to load trading state, running without persistence");
                (fresh_state(ctx.config.initial_capital), false)
            }
        };

    let weight_update = adapt_weights(&mut state.weights.data, &state.positions.data, now);
    run_debates(&mut opportunities, &indicators, &state.weights.data, outlook.bias);
    let trading = run_paper_trading(
        &mut state.positions.data,
        &opportunities,
        taxonomy,
        &indicators,
        &mut state.treasury.data,
        now,
    );

    if persisted {
        if let Err(e) = save_trading_state(&ctx.store, &mut state, now).await {
            tracing::error!(error = %e, "Failed to persist trading state");
            persisted = false;
        }
    }

    let finished_at = Utc::now();
    let elapsed = timer.elapsed();
    histogram!("cycle_duration_seconds").record(elapsed.as_secs_f64());
    counter!("cycles_total").increment(1);

    tracing::info!(
        cycle = %id,
        opportunities = opportunities.len(),
        whales = whales.len(),
        opened = trading.opened.len(),
        closed = trading.closed.len(),
        unavailable = snap.unavailable.len(),
        sentiment = %sentiment.label,
        elapsed_ms = elapsed.as_millis() as u64,
        "Cycle finished"
    );

    CycleReport {
        id,
        started_at,
        finished_at,
        opportunities,
        flows,
        whales,
        chains,
        exchanges,
        indicators,
        sentiment,
        macro_outlook: outlook,
        weights: state.weights.data,
        weight_update,
        treasury: state.treasury.data.summary(),
        positions: state.positions.data,
        trading,
        unavailable_sources: snap.unavailable,
        persisted,
    }
}

fn unsaved<T>(data: T) -> Versioned<T> {
    Versioned {
        version: 0,
        updated_at: None,
        data,
    }
}

fn fresh_state(initial_capital: Decimal) -> TradingState {
    TradingState {
        weights: unsaved(AgentWeights::default()),
        treasury: unsaved(TreasuryState::new(initial_capital)),
        positions: unsaved(Vec::new()),
    }
}
