use std::fmt;

use crate::metrics::MetricsTable;

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub duration_seconds: f64,
    pub peak_throughput: f64,
    pub max_latency_ms: f64,
    pub failure_workload: Option<u64>,
}

impl Summary {
    pub fn new(table: &MetricsTable) -> Self {
        Self {
            duration_seconds: table.duration(),
            peak_throughput: table.peak_throughput(),
            max_latency_ms: table.max_avg_latency(),
            failure_workload: table.first_failure().map(|(_, s)| s.workload),
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Test Summary ===")?;
        writeln!(f, "Total test duration: {:.1} seconds", self.duration_seconds)?;
        writeln!(f, "Peak throughput: {:.2} ops/sec", self.peak_throughput)?;
        write!(f, "Maximum latency: {:.2} ms", self.max_latency_ms)?;
        if let Some(workload) = self.failure_workload {
            write!(f, "\nFailure detected at workload: {workload} requests")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    #[test]
    fn reports_failure_workload() {
        let data = "timestamp,phase,workload,throughput,avg_latency_ms\n\
                    2025-01-01 00:00:00.000,WARMUP,10,100.5,2.25\n\
                    2025-01-01 00:00:30.000,FAILURE,80,950.126,41.5\n\
                    2025-01-01 00:01:00.000,FAILURE,90,400,120.456\n";
        let table = MetricsTable::parse(Path::new("m.csv"), data).unwrap();
        let summary = Summary::new(&table);
        assert_eq!(summary.failure_workload, Some(80));
        assert_eq!(
            summary.to_string(),
            "=== Test Summary ===\n\
             Total test duration: 60.0 seconds\n\
             Peak throughput: 950.13 ops/sec\n\
             Maximum latency: 120.46 ms\n\
             Failure detected at workload: 80 requests"
        );
    }

    #[test]
    fn no_failure_line_without_failure_rows() {
        let summary = Summary {
            duration_seconds: 12.34,
            peak_throughput: 10.0,
            max_latency_ms: 1.0,
            failure_workload: None,
        };
        assert_eq!(
            summary.to_string(),
            "=== Test Summary ===\n\
             Total test duration: 12.3 seconds\n\
             Peak throughput: 10.00 ops/sec\n\
             Maximum latency: 1.00 ms"
        );
    }
}
