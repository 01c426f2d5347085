//! The command line interface.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use perfinder_configuration::environment::Environment;
use perfinder_configuration::{
    make_runtime_configuration, parse_configuration, write_parsed_configuration, BenchmarkConfig,
    ConfigurationOverrides, ParsedConfiguration,
};
use query_engine_execution::metrics::Metrics;
use query_engine_execution::DriverRegistry;

use crate::benchmark::Benchmark;
use crate::report::BenchmarkReport;

/// Measure how long a SQL query takes to execute and to fetch.
#[derive(Debug, Parser)]
#[command(name = "perfinder", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a benchmark.
    Run(RunArgs),
    /// Write a configuration template and its JSON schema.
    Init {
        #[arg(default_value = ".", value_name = "DIRECTORY")]
        directory: PathBuf,
    },
    /// List the identifiers drivers can be selected with.
    Drivers {
        /// Driver manifest declaring additional driver identifiers.
        #[arg(long, env = "PERFINDER_DRIVER_ARTIFACT", value_name = "FILE")]
        driver_artifact: Option<PathBuf>,
    },
}

#[derive(Debug, clap::Args)]
pub struct RunArgs {
    /// Configuration file, or a directory containing configuration.yaml.
    #[arg(long, short = 'c', env = "PERFINDER_CONFIGURATION", value_name = "FILE")]
    pub configuration: Option<PathBuf>,
    #[command(flatten)]
    pub overrides: ConfigurationOverrides,
    /// Write the report to this file instead of stdout. The timing summary is still printed.
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = Format::Text)]
    pub format: Format,
    /// Write the collected metrics, in the Prometheus text format, to this file.
    #[arg(long, value_name = "FILE")]
    pub metrics: Option<PathBuf>,
}

/// How the report is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
}

/// Run a command.
pub async fn execute(cli: Cli, environment: impl Environment) -> anyhow::Result<()> {
    match cli.command {
        Command::Run(args) => run(args, environment).await,
        Command::Init { directory } => {
            let path = write_parsed_configuration(ParsedConfiguration::initial(), &directory)
                .await
                .with_context(|| format!("unable to initialize {}", directory.display()))?;
            println!("Wrote {}", path.display());
            Ok(())
        }
        Command::Drivers { driver_artifact } => {
            let mut registry = DriverRegistry::with_builtin_drivers();
            if let Some(path) = driver_artifact {
                registry.load_artifact(&path).await?;
            }
            for identifier in registry.identifiers() {
                println!("{identifier}");
            }
            Ok(())
        }
    }
}

async fn run(args: RunArgs, environment: impl Environment) -> anyhow::Result<()> {
    let parsed = match &args.configuration {
        Some(path) => parse_configuration(path).await?,
        None => ParsedConfiguration::empty(),
    };
    let config = make_runtime_configuration(parsed.apply(args.overrides), environment).await?;
    info!(
        query = %pretty_query(&config.query),
        iterations = config.iterations,
        "starting benchmark"
    );

    let mut metrics_registry = prometheus::Registry::new();
    let metrics = Metrics::initialize(&mut metrics_registry)
        .context("unable to initialize metrics")?;
    let mut benchmark =
        Benchmark::new(DriverRegistry::with_builtin_drivers()).with_metrics(metrics);
    let report = benchmark.run(&config).await?;

    let rendered = render(&config, &report, args.format)?;
    match &args.output {
        Some(path) => {
            write_file(path, rendered).await?;
            println!("{}", report.summary());
        }
        None => print!("{rendered}"),
    }

    if let Some(path) = &args.metrics {
        let exposition = prometheus::TextEncoder::new()
            .encode_to_string(&metrics_registry.gather())
            .context("unable to encode metrics")?;
        write_file(path, exposition).await?;
    }
    Ok(())
}

/// The report as written to the output.
pub fn render(
    config: &BenchmarkConfig,
    report: &BenchmarkReport,
    format: Format,
) -> anyhow::Result<String> {
    match format {
        Format::Text => Ok(format!("Executing Query: {}\n{report}\n", config.query)),
        Format::Json => Ok(serde_json::to_string_pretty(report)? + "\n"),
    }
}

fn pretty_query(query: &str) -> String {
    sqlformat::format(
        query,
        &sqlformat::QueryParams::None,
        sqlformat::FormatOptions::default(),
    )
}

async fn write_file(path: &Path, contents: String) -> anyhow::Result<()> {
    tokio::fs::write(path, contents)
        .await
        .with_context(|| format!("unable to write {}", path.display()))
}
