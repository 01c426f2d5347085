//! Metrics setup and update for the benchmark harness.

use std::time::Duration;

use prometheus::{Histogram, HistogramOpts, IntCounter, Registry};

/// Upper bounds of the duration histograms, in seconds, from 100µs to about 13s.
const DURATION_BUCKETS: (f64, f64, usize) = (0.0001, 2.0, 18);

/// Counters and histograms that record every execute and fetch.
#[derive(Debug, Clone)]
pub struct Metrics {
    execute_total: IntCounter,
    fetch_total: IntCounter,
    rows_fetched_total: IntCounter,
    execute_duration: Histogram,
    fetch_duration: Histogram,
}

impl Metrics {
    /// Set up counters and histograms and register them with `metrics_registry`.
    pub fn initialize(metrics_registry: &mut Registry) -> Result<Self, prometheus::Error> {
        let execute_total = add_int_counter_metric(
            metrics_registry,
            "perfinder_execute_total",
            "Total statement executions, including warm-up and dry runs.",
        )?;

        let fetch_total = add_int_counter_metric(
            metrics_registry,
            "perfinder_fetch_total",
            "Total result windows fetched.",
        )?;

        let rows_fetched_total = add_int_counter_metric(
            metrics_registry,
            "perfinder_rows_fetched_total",
            "Total rows materialized from result windows.",
        )?;

        let execute_duration = add_histogram_metric(
            metrics_registry,
            "perfinder_execute_duration_seconds",
            "Time spent executing the prepared statement, in seconds.",
        )?;

        let fetch_duration = add_histogram_metric(
            metrics_registry,
            "perfinder_fetch_duration_seconds",
            "Time spent fetching a result window, in seconds.",
        )?;

        Ok(Metrics {
            execute_total,
            fetch_total,
            rows_fetched_total,
            execute_duration,
            fetch_duration,
        })
    }

    /// Record an untimed execution, such as a warm-up.
    pub fn record_untimed_execution(&self) {
        self.execute_total.inc();
    }

    pub fn record_execution(&self, elapsed: Duration) {
        self.execute_total.inc();
        self.execute_duration.observe(elapsed.as_secs_f64());
    }

    /// Record an untimed fetch of `rows` rows.
    pub fn record_untimed_fetch(&self, rows: usize) {
        self.fetch_total.inc();
        self.rows_fetched_total.inc_by(rows as u64);
    }

    pub fn record_fetch(&self, elapsed: Duration, rows: usize) {
        self.record_untimed_fetch(rows);
        self.fetch_duration.observe(elapsed.as_secs_f64());
    }

    pub fn execute_total(&self) -> u64 {
        self.execute_total.get()
    }

    pub fn fetch_total(&self) -> u64 {
        self.fetch_total.get()
    }

    pub fn rows_fetched_total(&self) -> u64 {
        self.rows_fetched_total.get()
    }
}

/// Create a new int counter metric and register it with the provided Prometheus Registry
fn add_int_counter_metric(
    metrics_registry: &mut Registry,
    metric_name: &str,
    metric_description: &str,
) -> Result<IntCounter, prometheus::Error> {
    let int_counter =
        IntCounter::with_opts(prometheus::Opts::new(metric_name, metric_description))?;
    metrics_registry.register(Box::new(int_counter.clone()))?;
    Ok(int_counter)
}

/// Create a new histogram metric and register it with the provided Prometheus Registry
fn add_histogram_metric(
    metrics_registry: &mut Registry,
    metric_name: &str,
    metric_description: &str,
) -> Result<Histogram, prometheus::Error> {
    let (start, factor, count) = DURATION_BUCKETS;
    let histogram = Histogram::with_opts(
        HistogramOpts::new(metric_name, metric_description)
            .buckets(prometheus::exponential_buckets(start, factor, count)?),
    )?;
    metrics_registry.register(Box::new(histogram.clone()))?;
    Ok(histogram)
}
