use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::time::{interval, Duration, MissedTickBehavior};

use super::cycle::{run_cycle, CycleContext, CycleReport};

/// Shared slot holding the most recent cycle report.
pub type LatestReport = Arc<RwLock<Option<CycleReport>>>;

/// Run a cycle every `cycle_interval_secs`, publishing each report. The
/// first cycle starts immediately. A slow cycle delays the next tick
/// instead of stacking cycles.
pub async fn run_cycle_loop(ctx: Arc<CycleContext>, latest: LatestReport) {
    let period = Duration::from_secs(ctx.config.cycle_interval_secs.max(1));
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(
        interval_secs = period.as_secs(),
        scan_targets = ctx.config.scan_targets.len(),
        tvl_chains = ctx.config.tvl_chains.len(),
        exchanges = ctx.config.exchanges.len(),
        "Cycle loop started"
    );

    loop {
        ticker.tick().await;

        let report = run_cycle(&ctx).await;
        if !report.unavailable_sources.is_empty() {
            tracing::warn!(
                sources = ?report.unavailable_sources,
                "Cycle completed with missing sources"
            );
        }
        *latest.write().await = Some(report);
    }
}
