use std::sync::Arc;

use tokio::sync::RwLock;

use capflow::api::router::create_router;
use capflow::config::AppConfig;
use capflow::pipeline::{run_cycle_loop, CycleContext, LatestReport};
use capflow::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    let addr = format!("{}:{}", config.host, config.port);
    let metrics_handle = capflow::metrics::init_metrics()?;

    let ctx = Arc::new(CycleContext::from_config(config.clone()).await?);
    tracing::info!(
        data_dir = %ctx.store.dir().display(),
        scan_targets = ?ctx.config.scan_targets,
        "Cycle context ready"
    );

    // --- Cycle loop: fetch → classify → score → debate → paper trade ---
    let latest: LatestReport = Arc::new(RwLock::new(None));
    let loop_latest = latest.clone();
    tokio::spawn(async move {
        run_cycle_loop(ctx, loop_latest).await;
    });

    let state = AppState {
        config,
        latest,
        metrics_handle,
    };
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {addr}");
    axum::serve(listener, router).await?;

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}
