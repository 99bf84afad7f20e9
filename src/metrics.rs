use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus exporter and register all application metrics.
/// Returns a `PrometheusHandle` whose `render()` method produces the
/// text/plain Prometheus scrape payload.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    // Pre-register counters so they appear even before the first increment.
    counter!("fetch_requests_total").absolute(0);
    counter!("fetch_retries_total").absolute(0);
    counter!("fetch_failures_total").absolute(0);
    counter!("sources_unavailable_total").absolute(0);
    counter!("malformed_records_total").absolute(0);
    counter!("pairs_discarded_total", "reason" => "below_liquidity").absolute(0);
    counter!("pairs_discarded_total", "reason" => "wash_trade").absolute(0);
    counter!("opportunities_emitted_total").absolute(0);
    counter!("paper_positions_opened_total").absolute(0);
    counter!("paper_positions_closed_total", "reason" => "take_profit").absolute(0);
    counter!("paper_positions_closed_total", "reason" => "stop_loss").absolute(0);
    counter!("cycles_total").absolute(0);

    // Pre-register gauges at zero.
    gauge!("open_positions").set(0.0);
    gauge!("treasury_capital_usd").set(0.0);

    // Histogram is lazily created on first record; force creation.
    histogram!("cycle_duration_seconds").record(0.0);

    Ok(handle)
}
