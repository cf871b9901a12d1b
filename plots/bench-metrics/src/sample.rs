use std::{fmt, path::Path};

use chrono::{DateTime, FixedOffset};
use common::{
    NS_PER_MS,
    error::PlotError,
    util::{ColumnIndex, parse_timestamp},
};
use csv::{ReaderBuilder, Trim};
use tracing::debug;

const BENCH_TYPE: &str = "bench_type";
const GROUP_START_TIME: &str = "group_start_time";
const AVERAGE_LATENCY: &str = "average_latency";
const MAX_LATENCY: &str = "max_latency";
const P99_LATENCY: &str = "99th_latency";
const THROUGHPUT: &str = "throughput";

/// Operation types that get plotted. Everything else in the summary file
/// (setup, cleanup, ...) is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BenchType {
    Read,
    Write,
}

impl BenchType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "READ" => Some(BenchType::Read),
            "WRITE" => Some(BenchType::Write),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BenchType::Read => "READ",
            BenchType::Write => "WRITE",
        }
    }
}

impl fmt::Display for BenchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One client's measurement for one time bucket, latencies in ms.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchSample {
    pub bench_type: BenchType,
    pub group_start: DateTime<FixedOffset>,
    pub avg_latency_ms: f64,
    pub max_latency_ms: f64,
    pub p99_latency_ms: f64,
    pub throughput: f64,
}

#[derive(Debug, Clone, Copy)]
struct SampleColumns {
    group_start_time: usize,
    average_latency: usize,
    max_latency: usize,
    p99_latency: usize,
    throughput: usize,
}

impl SampleColumns {
    fn resolve(columns: &ColumnIndex) -> Result<Self, PlotError> {
        Ok(Self {
            group_start_time: columns.position(GROUP_START_TIME)?,
            average_latency: columns.position(AVERAGE_LATENCY)?,
            max_latency: columns.position(MAX_LATENCY)?,
            p99_latency: columns.position(P99_LATENCY)?,
            throughput: columns.position(THROUGHPUT)?,
        })
    }
}

/// Parses the READ/WRITE rows of a summary file.
///
/// Rows of other types are skipped before any other field is looked at, so
/// they may be incomplete. The remaining columns are only required once the
/// first READ/WRITE row shows up.
pub fn parse_samples(path: &Path, data: &str) -> Result<Vec<BenchSample>, PlotError> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(data.as_bytes());
    let headers = reader
        .headers()
        .map_err(|e| PlotError::parse(path, e))?
        .clone();
    let columns = ColumnIndex::new(path, &headers);

    let mut resolved: Option<SampleColumns> = None;
    let mut samples = Vec::new();
    let mut skipped = 0usize;
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| PlotError::parse(path, e))?;
        let line = record.position().map_or(i as u64 + 2, |p| p.line());

        let type_idx = columns.position(BENCH_TYPE)?;
        let Some(bench_type) = record.get(type_idx).and_then(BenchType::parse) else {
            skipped += 1;
            continue;
        };
        let idx = match resolved {
            Some(idx) => idx,
            None => *resolved.insert(SampleColumns::resolve(&columns)?),
        };

        samples.push(BenchSample {
            bench_type,
            group_start: parse_timestamp(columns.field(&record, idx.group_start_time, line)?)?,
            avg_latency_ms: columns.float(&record, idx.average_latency, line)? / NS_PER_MS,
            max_latency_ms: columns.float(&record, idx.max_latency, line)? / NS_PER_MS,
            p99_latency_ms: columns.float(&record, idx.p99_latency, line)? / NS_PER_MS,
            throughput: columns.float(&record, idx.throughput, line)?,
        });
    }

    debug!(
        "{}: {} READ/WRITE samples, {skipped} other rows skipped",
        path.display(),
        samples.len()
    );
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "client_id,bench_type,group_start_time,operations,errors,average_latency,min_latency,max_latency,99th_latency,throughput";

    fn parse(rows: &[&str]) -> Result<Vec<BenchSample>, PlotError> {
        let data = std::iter::once(HEADER)
            .chain(rows.iter().copied())
            .collect::<Vec<_>>()
            .join("\n");
        parse_samples(Path::new("summary.dat"), &data)
    }

    #[test]
    fn converts_latencies_to_ms() {
        let samples =
            parse(&["0,READ,2025-01-01T00:00:00.12345678Z,10,0,10e6,1e6,20e6,15e6,100"]).unwrap();
        assert_eq!(samples.len(), 1);
        let s = &samples[0];
        assert_eq!(s.bench_type, BenchType::Read);
        assert_eq!(s.avg_latency_ms, 10.0);
        assert_eq!(s.max_latency_ms, 20.0);
        assert_eq!(s.p99_latency_ms, 15.0);
        assert_eq!(s.throughput, 100.0);
    }

    #[test]
    fn other_types_skipped_even_when_malformed() {
        let samples = parse(&[
            "0,SETUP,not-a-time,,,,,,,",
            "1,CLEANUP",
            "2,WRITE,2025-01-01T00:00:01.5Z,10,0,1000000,0,2000000,3000000,42.5",
        ])
        .unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].bench_type, BenchType::Write);
        assert_eq!(samples[0].throughput, 42.5);
    }

    #[test]
    fn malformed_accepted_row_fails() {
        let err = parse(&["0,READ,2025-01-01T00:00:00.1Z,10,0,fast,0,1,1,1"]).unwrap_err();
        assert!(matches!(err, PlotError::Parse { .. }), "{err:?}");
    }

    #[test]
    fn bad_timestamp_fails() {
        let err = parse(&["0,READ,2025-01-01 at noon,10,0,1,0,1,1,1"]).unwrap_err();
        assert!(matches!(err, PlotError::TimestampParse { .. }), "{err:?}");
    }

    #[test]
    fn missing_column_only_matters_for_accepted_rows() {
        let data = "bench_type,group_start_time,average_latency\nSETUP,x,1\n";
        assert!(parse_samples(Path::new("s.dat"), data).unwrap().is_empty());

        let data = "bench_type,group_start_time,average_latency\nREAD,2025-01-01T00:00:00Z,1\n";
        let err = parse_samples(Path::new("s.dat"), data).unwrap_err();
        assert!(
            matches!(&err, PlotError::MissingColumn { column, .. } if column == MAX_LATENCY),
            "{err:?}"
        );
    }

    #[test]
    fn bench_type_round_trips_names() {
        assert_eq!(BenchType::parse("READ"), Some(BenchType::Read));
        assert_eq!(BenchType::parse("read"), None);
        assert_eq!(BenchType::Write.to_string(), "WRITE");
        assert!(BenchType::Read < BenchType::Write);
    }
}
