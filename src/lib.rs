pub mod api;
pub mod config;
pub mod errors;
pub mod execution;
pub mod intelligence;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod sources;
pub mod store;

use crate::config::AppConfig;
use crate::pipeline::LatestReport;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub latest: LatestReport,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}
