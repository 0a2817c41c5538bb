use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus exporter and register all application metrics.
/// Returns a `PrometheusHandle` whose `render()` method produces the
/// text/plain Prometheus scrape payload.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    // Pre-register counters so they appear even before the first increment.
    counter!("forecasts_created_total").absolute(0);
    counter!("forecast_versions_total").absolute(0);
    counter!("forecasts_deleted_total").absolute(0);
    counter!("attestations_recorded_total").absolute(0);
    counter!("tier_promotions_total").absolute(0);
    counter!("tier_demotions_total").absolute(0);
    counter!("concurrent_write_conflicts_total").absolute(0);

    Ok(handle)
}

/// Handle backed by a recorder that is not installed globally.
/// Lets tests build any number of app instances in one process.
pub fn detached_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}
