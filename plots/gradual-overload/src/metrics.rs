use std::path::Path;

use chrono::{DateTime, FixedOffset};
use common::{
    error::PlotError,
    util::{ColumnIndex, deserialize_timestamp, seconds_since},
};
use csv::{ReaderBuilder, Trim};
use itertools::Itertools;
use serde::Deserialize;

pub const FAILURE_PHASE: &str = "FAILURE";

/// One row of `gradual_overload_metrics.csv`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MetricSample {
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<FixedOffset>,
    pub throughput: f64,
    pub avg_latency_ms: f64,
    #[serde(default)]
    pub p99_latency_ms: Option<f64>,
    pub workload: u64,
    #[serde(default)]
    pub phase: Option<String>,
}

/// Metric rows aligned on a common start time.
#[derive(Debug, Clone)]
pub struct MetricsTable {
    pub samples: Vec<MetricSample>,
    /// `time_seconds` of each sample, same order as `samples`
    pub time_seconds: Vec<f64>,
    pub start_time: DateTime<FixedOffset>,
    pub has_p99: bool,
}

impl MetricsTable {
    pub fn parse(path: &Path, data: &str) -> Result<Self, PlotError> {
        let mut reader = ReaderBuilder::new()
            .trim(Trim::All)
            .from_reader(data.as_bytes());
        let headers = reader
            .headers()
            .map_err(|e| PlotError::parse(path, e))?
            .clone();
        let has_p99 = ColumnIndex::new(path, &headers).contains("p99_latency_ms");

        let samples = reader
            .deserialize::<MetricSample>()
            .map(|row| row.map_err(|e| PlotError::parse(path, e)))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_samples(path, samples, has_p99)
    }

    pub fn from_samples(
        path: &Path,
        samples: Vec<MetricSample>,
        has_p99: bool,
    ) -> Result<Self, PlotError> {
        let start_time = samples
            .iter()
            .map(|s| s.timestamp)
            .min()
            .ok_or_else(|| PlotError::parse(path, "no data rows"))?;
        let time_seconds = samples
            .iter()
            .map(|s| seconds_since(&start_time, &s.timestamp))
            .collect();
        Ok(Self {
            samples,
            time_seconds,
            start_time,
            has_p99,
        })
    }

    pub fn relative(&self, ts: &DateTime<FixedOffset>) -> f64 {
        seconds_since(&self.start_time, ts)
    }

    pub fn duration(&self) -> f64 {
        self.time_seconds.iter().copied().fold(0.0, f64::max)
    }

    pub fn peak_throughput(&self) -> f64 {
        self.samples
            .iter()
            .map(|s| s.throughput)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn max_avg_latency(&self) -> f64 {
        self.samples
            .iter()
            .map(|s| s.avg_latency_ms)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// First row recorded while the load tool was in the FAILURE phase.
    pub fn first_failure(&self) -> Option<(f64, &MetricSample)> {
        self.time_seconds
            .iter()
            .copied()
            .zip(&self.samples)
            .find(|(_, s)| s.phase.as_deref() == Some(FAILURE_PHASE))
    }

    /// `(time_seconds, value)` pairs for one column.
    pub fn points(&self, value: impl Fn(&MetricSample) -> f64) -> Vec<(f64, f64)> {
        self.time_seconds
            .iter()
            .copied()
            .zip(self.samples.iter().map(value))
            .collect()
    }

    /// P99 points for the rows that carry a value.
    pub fn p99_points(&self) -> Vec<(f64, f64)> {
        self.time_seconds
            .iter()
            .zip(&self.samples)
            .filter_map(|(t, s)| s.p99_latency_ms.map(|v| (*t, v)))
            .collect_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "timestamp,phase,workload,throughput,avg_latency_ms,max_latency_ms,p99_latency_ms,errors,total_requests";

    fn table(rows: &[&str]) -> Result<MetricsTable, PlotError> {
        let data = std::iter::once(HEADER)
            .chain(rows.iter().copied())
            .join("\n");
        MetricsTable::parse(Path::new("m.csv"), &data)
    }

    #[test]
    fn aligns_on_earliest_timestamp() {
        let t = table(&[
            "2025-01-01 00:00:10.000,WARMUP,10,100.00,5.00,9.00,8.00,0,1000",
            "2025-01-01 00:00:00.000,INIT,5,50.00,4.00,6.00,5.50,0,500",
            "2025-01-01 00:01:00.500,FAILURE,120,80.00,40.00,90.00,70.00,3,7200",
        ])
        .unwrap();
        assert_eq!(t.time_seconds, vec![10.0, 0.0, 60.5]);
        assert_eq!(t.duration(), 60.5);
        assert_eq!(t.peak_throughput(), 100.0);
        assert_eq!(t.max_avg_latency(), 40.0);
        assert!(t.has_p99);

        let (at, row) = t.first_failure().unwrap();
        assert_eq!(at, 60.5);
        assert_eq!(row.workload, 120);
    }

    #[test]
    fn optional_columns_may_be_absent() {
        let data = "timestamp,throughput,avg_latency_ms,workload\n\
                    2025-01-01 00:00:00.000,10,1,5\n\
                    2025-01-01 00:00:05.000,20,2,10\n";
        let t = MetricsTable::parse(Path::new("m.csv"), data).unwrap();
        assert!(!t.has_p99);
        assert!(t.p99_points().is_empty());
        assert!(t.first_failure().is_none());
        assert_eq!(t.points(|s| s.workload as f64), vec![(0.0, 5.0), (5.0, 10.0)]);
    }

    #[test]
    fn empty_or_malformed_input_fails() {
        assert!(matches!(table(&[]), Err(PlotError::Parse { .. })));
        assert!(matches!(
            table(&["2025-01-01 00:00:00.000,INIT,5,fast,4.00,6.00,5.50,0,500"]),
            Err(PlotError::Parse { .. })
        ));
        assert!(matches!(
            table(&["soon,INIT,5,1,4.00,6.00,5.50,0,500"]),
            Err(PlotError::Parse { .. })
        ));
    }
}
