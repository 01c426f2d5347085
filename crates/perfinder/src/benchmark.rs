//! Run a benchmark: prepare a statement once, then execute it and fetch its result
//! window repeatedly, timing each execute and each fetch separately.

use std::time::Instant;

use perfinder_configuration::BenchmarkConfig;
use query_engine_execution::metrics::Metrics;
use query_engine_execution::{
    fetch_window, Connection, Credentials, DriverRegistry, Row, Statement, Window,
};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::error::{BenchmarkError, Phase};
use crate::report::{BenchmarkReport, TimingSample};

/// Runs benchmarks with the drivers of a registry.
#[derive(Debug)]
pub struct Benchmark {
    registry: DriverRegistry,
    metrics: Option<Metrics>,
}

impl Benchmark {
    pub fn new(registry: DriverRegistry) -> Self {
        Benchmark {
            registry,
            metrics: None,
        }
    }

    /// Record every execute and fetch in `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn registry(&self) -> &DriverRegistry {
        &self.registry
    }

    /// Run the benchmark described by `config`.
    ///
    /// The statement is prepared once. It is then executed and fetched once to warm up,
    /// once more for the dry run whose rows are reported, and `config.iterations` times
    /// with timing. Once connected, the connection is closed whatever the outcome.
    pub async fn run(
        &mut self,
        config: &BenchmarkConfig,
    ) -> Result<BenchmarkReport, BenchmarkError> {
        let driver = self
            .registry
            .load_driver(&config.driver, config.driver_artifact.as_deref())
            .instrument(info_span!("Load driver", identifier = %config.driver))
            .await
            .map_err(BenchmarkError::during(Phase::LoadDriver))?;

        let credentials = config.username.as_ref().map(|username| Credentials {
            username: username.clone(),
            password: config.password.clone(),
        });
        let mut connection = driver
            .connect(&config.connection_url, credentials.as_ref())
            .instrument(info_span!("Connect", driver = driver.name()))
            .await
            .map_err(BenchmarkError::during(Phase::Connect))?;

        let result = measure(connection.as_mut(), config, self.metrics.as_ref()).await;

        if let Err(err) = connection.close().await {
            warn!(error = %err, "unable to close the connection");
        }
        result
    }
}

/// Run a benchmark with the drivers linked into the binary.
pub async fn run(config: &BenchmarkConfig) -> Result<BenchmarkReport, BenchmarkError> {
    Benchmark::new(DriverRegistry::with_builtin_drivers())
        .run(config)
        .await
}

async fn measure(
    connection: &mut dyn Connection,
    config: &BenchmarkConfig,
    metrics: Option<&Metrics>,
) -> Result<BenchmarkReport, BenchmarkError> {
    let window = Window::new(config.row_offset, config.max_rows);

    let mut statement = connection
        .prepare(&config.query, config.fetch_size, &config.parameters)
        .instrument(info_span!("Prepare statement"))
        .await
        .map_err(BenchmarkError::during(Phase::Prepare))?;

    untimed_run(statement.as_mut(), window, metrics)
        .instrument(info_span!("Warm up"))
        .await
        .map_err(BenchmarkError::during(Phase::WarmUp))?;

    let dry_run_rows = untimed_run(statement.as_mut(), window, metrics)
        .instrument(info_span!("Dry run"))
        .await
        .map_err(BenchmarkError::during(Phase::DryRun))?;
    info!(rows = dry_run_rows.len(), "dry run complete");

    let mut samples = Vec::with_capacity(config.iterations);
    for iteration in 1..=config.iterations {
        let sample = timed_run(statement.as_mut(), window, metrics)
            .instrument(info_span!("Measure", iteration))
            .await
            .map_err(BenchmarkError::during(Phase::Measure { iteration }))?;
        samples.push(sample);
    }

    Ok(BenchmarkReport::new(dry_run_rows, &samples))
}

/// Execute and fetch without timing anything.
async fn untimed_run(
    statement: &mut (dyn Statement + '_),
    window: Window,
    metrics: Option<&Metrics>,
) -> Result<Vec<Row>, query_engine_execution::Error> {
    let mut cursor = statement.execute().await?;
    let rows = fetch_window(cursor.as_mut(), window).await?;
    cursor.close().await?;

    if let Some(metrics) = metrics {
        metrics.record_untimed_execution();
        metrics.record_untimed_fetch(rows.len());
    }
    Ok(rows)
}

/// Execute and fetch, timing each on its own. Only the execute call and the window fetch
/// are inside the clocks; closing the cursor and recording metrics are not.
async fn timed_run(
    statement: &mut (dyn Statement + '_),
    window: Window,
    metrics: Option<&Metrics>,
) -> Result<TimingSample, query_engine_execution::Error> {
    let started = Instant::now();
    let mut cursor = statement.execute().await?;
    let execute = started.elapsed();

    let started = Instant::now();
    let rows = fetch_window(cursor.as_mut(), window).await?;
    let fetch = started.elapsed();

    cursor.close().await?;

    if let Some(metrics) = metrics {
        metrics.record_execution(execute);
        metrics.record_fetch(fetch, rows.len());
    }
    debug!(
        execute_ms = execute.as_secs_f64() * 1000.0,
        fetch_ms = fetch.as_secs_f64() * 1000.0,
        rows = rows.len(),
        "measured"
    );
    Ok(TimingSample { execute, fetch })
}
