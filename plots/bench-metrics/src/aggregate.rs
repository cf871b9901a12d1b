use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use common::util::seconds_since;

use crate::sample::{BenchSample, BenchType};

/// Cross-client view of one time bucket: latencies averaged, throughput summed.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedPoint {
    pub timestamp: DateTime<FixedOffset>,
    /// Seconds since the first bucket of the same operation type
    pub time_seconds: f64,
    pub avg_latency_ms: f64,
    pub max_latency_ms: f64,
    pub p99_latency_ms: f64,
    pub throughput: f64,
    pub clients: usize,
}

#[derive(Debug, Default)]
struct Bucket {
    avg_latency_ms: f64,
    max_latency_ms: f64,
    p99_latency_ms: f64,
    throughput: f64,
    count: usize,
}

impl Bucket {
    fn add(&mut self, sample: &BenchSample) {
        self.avg_latency_ms += sample.avg_latency_ms;
        self.max_latency_ms += sample.max_latency_ms;
        self.p99_latency_ms += sample.p99_latency_ms;
        self.throughput += sample.throughput;
        self.count += 1;
    }
}

/// Groups samples by (type, exact timestamp) and reduces each group.
///
/// Only bit-identical parsed timestamps are merged. The result holds one
/// series per type present, each sorted by timestamp.
pub fn aggregate(
    samples: impl IntoIterator<Item = BenchSample>,
) -> BTreeMap<BenchType, Vec<AggregatedPoint>> {
    let mut groups: BTreeMap<BenchType, BTreeMap<DateTime<FixedOffset>, Bucket>> = BTreeMap::new();
    for sample in samples {
        groups
            .entry(sample.bench_type)
            .or_default()
            .entry(sample.group_start)
            .or_default()
            .add(&sample);
    }

    groups
        .into_iter()
        .map(|(bench_type, buckets)| (bench_type, reduce(buckets)))
        .collect()
}

fn reduce(buckets: BTreeMap<DateTime<FixedOffset>, Bucket>) -> Vec<AggregatedPoint> {
    let Some(start) = buckets.keys().next().copied() else {
        return Vec::new();
    };
    buckets
        .into_iter()
        .map(|(timestamp, bucket)| {
            let n = bucket.count as f64;
            AggregatedPoint {
                timestamp,
                time_seconds: seconds_since(&start, &timestamp),
                avg_latency_ms: bucket.avg_latency_ms / n,
                max_latency_ms: bucket.max_latency_ms / n,
                p99_latency_ms: bucket.p99_latency_ms / n,
                throughput: bucket.throughput,
                clients: bucket.count,
            }
        })
        .collect()
}
