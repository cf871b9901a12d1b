use std::{collections::BTreeMap, path::PathBuf};

use common::{
    chart::{self, LineKind, ORANGE, Series},
    config::Settings,
    plot::Plot,
    util::{padded_range, read_input},
};
use eyre::{Context, Result};
use plotters::style::{BLUE, GREEN, RED, RGBColor};
use tracing::{debug, info};

mod aggregate;
mod sample;

pub use aggregate::{AggregatedPoint, aggregate};
pub use sample::{BenchSample, BenchType, parse_samples};

pub const NO_DATA_MESSAGE: &str = "No READ/WRITE test data found";

/// Latency and throughput over time for each operation type of a summary
/// file, one 2x2 figure per type.
#[derive(Debug, Clone)]
pub struct BenchMetrics {
    summary: PathBuf,
}

struct MetricPanel {
    caption: &'static str,
    label: &'static str,
    y_desc: &'static str,
    colour: RGBColor,
    value: fn(&AggregatedPoint) -> f64,
}

impl BenchMetrics {
    pub fn new(summary: impl Into<PathBuf>) -> Self {
        Self {
            summary: summary.into(),
        }
    }

    /// `<dir>/<stem>_<TYPE>_metrics.png` next to the summary file.
    pub fn output_path(&self, bench_type: BenchType) -> PathBuf {
        let stem = self
            .summary
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.summary
            .with_file_name(format!("{stem}_{bench_type}_metrics.png"))
    }

    /// Reads and aggregates the summary file. Empty when it holds no READ/WRITE rows.
    pub async fn load(&self) -> Result<BTreeMap<BenchType, Vec<AggregatedPoint>>> {
        let data = read_input(&self.summary).await?;
        let samples = parse_samples(&self.summary, &data)?;
        let series = aggregate(samples);
        for (bench_type, points) in &series {
            let clients = points.iter().map(|p| p.clients).max().unwrap_or(0);
            debug!(
                "{bench_type}: {} time buckets, up to {clients} clients per bucket",
                points.len()
            );
        }
        Ok(series)
    }

    fn render(
        &self,
        bench_type: BenchType,
        points: &[AggregatedPoint],
        settings: &Settings,
    ) -> Result<PathBuf> {
        let output = self.output_path(bench_type);
        let title = format!("ZKBench Metrics - {bench_type} Operations");
        let figure = chart::figure(&output, settings, &title)?;

        let panels = [
            MetricPanel {
                caption: "Average Latency (Mean across clients)",
                label: "Avg Latency",
                y_desc: "Latency (ms)",
                colour: BLUE,
                value: |p| p.avg_latency_ms,
            },
            MetricPanel {
                caption: "Max Latency (Mean across clients)",
                label: "Max Latency",
                y_desc: "Latency (ms)",
                colour: RED,
                value: |p| p.max_latency_ms,
            },
            MetricPanel {
                caption: "99th Percentile Latency (Mean across clients)",
                label: "P99 Latency",
                y_desc: "Latency (ms)",
                colour: ORANGE,
                value: |p| p.p99_latency_ms,
            },
            MetricPanel {
                caption: "Throughput (Sum across all clients)",
                label: "Throughput (sum)",
                y_desc: "Operations/second",
                colour: GREEN,
                value: |p| p.throughput,
            },
        ];

        let x_range = padded_range(points.iter().map(|p| p.time_seconds));
        for (area, panel) in figure.split_evenly((2, 2)).iter().zip(panels) {
            let series = Series::new(panel.label, panel.colour, LineKind::Markers)
                .with_points(points.iter().map(|p| (p.time_seconds, (panel.value)(p))));
            let y_range = padded_range(series.points.iter().map(|p| p.1));
            let mut chart = chart::panel(
                area,
                settings,
                Some(panel.caption),
                x_range.clone(),
                y_range,
                "Time (seconds)",
                panel.y_desc,
            )?;
            chart::draw_series(&mut chart, &series, settings)?;
            chart::draw_legend(&mut chart, settings)?;
        }

        figure
            .present()
            .wrap_err_with(|| format!("Write {}", output.display()))?;
        Ok(output.clone())
    }
}

#[async_trait::async_trait]
impl Plot for BenchMetrics {
    fn name(&self) -> &'static str {
        "bench-metrics"
    }

    fn required_inputs(&self) -> Vec<PathBuf> {
        vec![self.summary.clone()]
    }

    async fn plot(&self, settings: &Settings) -> Result<()> {
        let series = self.load().await?;
        if series.is_empty() {
            println!("{NO_DATA_MESSAGE}");
            return Ok(());
        }

        for (bench_type, points) in &series {
            let output = self.render(*bench_type, points, settings)?;
            info!("Wrote {bench_type} metrics to {}", output.display());
            println!("Saved: {}", output.display());
        }
        Ok(())
    }
}
