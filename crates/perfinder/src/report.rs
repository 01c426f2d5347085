//! The outcome of a benchmark run.

use std::time::Duration;

use query_engine_execution::Row;
use serde::Serialize;

/// The time spent executing the statement and fetching its window, in one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingSample {
    pub execute: Duration,
    pub fetch: Duration,
}

/// What a successful run reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkReport {
    /// Rows materialized by the dry run.
    pub dry_run_row_count: usize,
    pub dry_run_rows: Vec<Row>,
    /// One entry per measured iteration, in order.
    pub query_times_ms: Vec<f64>,
    pub fetch_times_ms: Vec<f64>,
    pub average_query_time_ms: f64,
    pub average_fetch_time_ms: f64,
}

impl BenchmarkReport {
    pub fn new(dry_run_rows: Vec<Row>, samples: &[TimingSample]) -> Self {
        let query_times_ms: Vec<f64> = samples
            .iter()
            .map(|sample| milliseconds(sample.execute))
            .collect();
        let fetch_times_ms: Vec<f64> = samples
            .iter()
            .map(|sample| milliseconds(sample.fetch))
            .collect();

        BenchmarkReport {
            dry_run_row_count: dry_run_rows.len(),
            dry_run_rows,
            average_query_time_ms: mean(&query_times_ms),
            average_fetch_time_ms: mean(&fetch_times_ms),
            query_times_ms,
            fetch_times_ms,
        }
    }

    /// The timing lines of the report, without the dry-run rows.
    pub fn summary(&self) -> String {
        format!(
            "Query Times (ms): {}\nFetch Times (ms): {}\nAverage Query Time (ms): {:.3}\nAverage Fetch Time (ms): {:.3}",
            render_times(&self.query_times_ms),
            render_times(&self.fetch_times_ms),
            self.average_query_time_ms,
            self.average_fetch_time_ms,
        )
    }
}

impl std::fmt::Display for BenchmarkReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Record Count: {}", self.dry_run_row_count)?;
        writeln!(f, "Data:")?;
        for row in &self.dry_run_rows {
            writeln!(f, "{row}")?;
        }
        write!(f, "{}", self.summary())
    }
}

/// The arithmetic mean, or zero for no values.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn milliseconds(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

fn render_times(times: &[f64]) -> String {
    let rendered: Vec<String> = times.iter().map(|time| format!("{time:.3}")).collect();
    format!("[{}]", rendered.join(", "))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use similar_asserts::assert_eq;

    use super::*;

    fn sample(execute_micros: u64, fetch_micros: u64) -> TimingSample {
        TimingSample {
            execute: Duration::from_micros(execute_micros),
            fetch: Duration::from_micros(fetch_micros),
        }
    }

    fn report() -> BenchmarkReport {
        let rows = (0..2)
            .map(|id| [("id", json!(id))].into_iter().collect())
            .collect();
        BenchmarkReport::new(
            rows,
            &[sample(1000, 500), sample(2000, 500), sample(3000, 500)],
        )
    }

    #[test]
    fn mean_of_values() {
        assert_eq!(mean(&[10.0, 20.0, 30.0]), 20.0);
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn one_entry_per_sample() {
        let report = report();
        assert_eq!(report.dry_run_row_count, 2);
        assert_eq!(report.query_times_ms, vec![1.0, 2.0, 3.0]);
        assert_eq!(report.fetch_times_ms, vec![0.5, 0.5, 0.5]);
        assert_eq!(report.average_query_time_ms, 2.0);
        assert_eq!(report.average_fetch_time_ms, 0.5);
    }

    #[test]
    fn renders_as_text() {
        insta::assert_snapshot!(report().to_string(), @r###"
        Record Count: 2
        Data:
        {"id":0}
        {"id":1}
        Query Times (ms): [1.000, 2.000, 3.000]
        Fetch Times (ms): [0.500, 0.500, 0.500]
        Average Query Time (ms): 2.000
        Average Fetch Time (ms): 0.500
        "###);
    }

    #[test]
    fn the_summary_has_no_trailing_newline() {
        assert_eq!(
            report().summary(),
            "Query Times (ms): [1.000, 2.000, 3.000]\n\
             Fetch Times (ms): [0.500, 0.500, 0.500]\n\
             Average Query Time (ms): 2.000\n\
             Average Fetch Time (ms): 0.500"
        );
    }

    #[test]
    fn serializes_as_camel_case_json() {
        let value = serde_json::to_value(report()).unwrap();
        assert_eq!(value["dryRunRowCount"], json!(2));
        assert_eq!(value["dryRunRows"], json!([{"id": 0}, {"id": 1}]));
        assert_eq!(value["queryTimesMs"], json!([1.0, 2.0, 3.0]));
        assert_eq!(value["averageFetchTimeMs"], json!(0.5));
    }
}
