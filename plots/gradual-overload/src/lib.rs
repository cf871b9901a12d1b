use std::path::PathBuf;

use common::{
    chart::{self, LineKind, Series},
    config::Settings,
    plot::Plot,
    util::{padded_range, read_input},
};
use eyre::{Context, Result};
use itertools::Itertools;
use plotters::style::{BLUE, GREEN, RED};
use tracing::{debug, info};

mod metrics;
mod phase;
mod summary;

pub use metrics::{FAILURE_PHASE, MetricSample, MetricsTable};
pub use phase::{
    DEFAULT_PHASE_COLOUR, PhaseSpan, PhaseTransition, parse_transitions, phase_colour,
    phase_spans,
};
pub use summary::Summary;

const TITLE: &str = "Gradual Overload Test: |Init|Warmup|Load Increase|Failure|Mitigation|";
const SPAN_OPACITY: f64 = 0.2;
/// How far before the failure point the annotation text sits, in seconds
const ANNOTATION_LEAD: f64 = 10.0;
const ANNOTATION_RISE: f64 = 1.2;

/// Throughput, latency and workload of a staged overload test with the
/// phases it went through shaded in.
#[derive(Debug, Clone)]
pub struct GradualOverload {
    prefix: String,
}

/// Both input files of one run, aligned on the first metrics timestamp.
#[derive(Debug, Clone)]
pub struct OverloadRun {
    pub metrics: MetricsTable,
    /// `(phase, seconds since start)` in file order
    pub transitions: Vec<(String, f64)>,
    pub spans: Vec<PhaseSpan>,
}

struct Annotation {
    from: (f64, f64),
    to: (f64, f64),
    lines: Vec<String>,
}

impl OverloadRun {
    fn failure_annotation(&self) -> Option<Annotation> {
        let (at, row) = self.metrics.first_failure()?;
        Some(Annotation {
            from: (at - ANNOTATION_LEAD, row.throughput * ANNOTATION_RISE),
            to: (at, row.throughput),
            lines: vec!["Failure".to_owned(), format!("{} req", row.workload)],
        })
    }
}

impl GradualOverload {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn metrics_path(&self) -> PathBuf {
        PathBuf::from(format!("{}gradual_overload_metrics.csv", self.prefix))
    }

    pub fn phases_path(&self) -> PathBuf {
        PathBuf::from(format!("{}phase_transitions.csv", self.prefix))
    }

    pub fn output_path(&self) -> PathBuf {
        PathBuf::from(format!("{}visualization.png", self.prefix))
    }

    pub async fn load(&self) -> Result<OverloadRun> {
        let metrics_path = self.metrics_path();
        let phases_path = self.phases_path();
        let (metrics, phases) =
            tokio::try_join!(read_input(&metrics_path), read_input(&phases_path))?;

        let metrics = MetricsTable::parse(&metrics_path, &metrics)?;
        let transitions = parse_transitions(&phases_path, &phases)?
            .into_iter()
            .map(|t| (t.phase, metrics.relative(&t.timestamp)))
            .collect_vec();
        let spans = phase_spans(&transitions, metrics.duration());
        debug!(
            "{} metric rows, {} phase transitions",
            metrics.samples.len(),
            transitions.len()
        );

        Ok(OverloadRun {
            metrics,
            transitions,
            spans,
        })
    }

    fn render(&self, run: &OverloadRun, settings: &Settings) -> Result<PathBuf> {
        let output = self.output_path();
        let figure = chart::figure(&output, settings, TITLE)?;

        let metrics = &run.metrics;
        let mut latency = vec![
            Series::new("Avg Latency", RED, LineKind::Solid)
                .with_points(metrics.points(|s| s.avg_latency_ms)),
        ];
        if metrics.has_p99 {
            latency.push(
                Series::new("P99 Latency", RED, LineKind::Dashed)
                    .with_points(metrics.p99_points()),
            );
        }
        let panels = [
            (
                "Throughput (ops/sec)",
                vec![
                    Series::new("Throughput", BLUE, LineKind::Solid)
                        .with_points(metrics.points(|s| s.throughput)),
                ],
            ),
            ("Latency (ms)", latency),
            (
                "Workload (requests)",
                vec![
                    Series::new("Workload", GREEN, LineKind::Solid)
                        .with_points(metrics.points(|s| s.workload as f64)),
                ],
            ),
        ];

        let annotation = run.failure_annotation();
        let x_range = padded_range(
            metrics
                .time_seconds
                .iter()
                .copied()
                .chain(run.transitions.iter().map(|(_, at)| *at))
                .chain(annotation.iter().map(|a| a.from.0)),
        );
        // Resolved once so unknown phases are only reported once.
        let shading = run
            .spans
            .iter()
            .map(|span| (span.start, span.end, span.colour()))
            .collect_vec();

        for (i, (area, (y_desc, series))) in figure
            .split_evenly((3, 1))
            .iter()
            .zip(panels)
            .enumerate()
        {
            let panel_annotation = annotation.as_ref().filter(|_| i == 0);
            let y_range = padded_range(
                series
                    .iter()
                    .flat_map(|s| s.points.iter().map(|p| p.1))
                    .chain(panel_annotation.map(|a| a.from.1)),
            );
            let mut chart = chart::panel(
                area,
                settings,
                None,
                x_range.clone(),
                y_range,
                "Time (seconds)",
                y_desc,
            )?;

            for &(start, end, colour) in &shading {
                chart::draw_span(&mut chart, start, end, colour, SPAN_OPACITY)?;
            }
            for s in &series {
                chart::draw_series(&mut chart, s, settings)?;
            }
            for (phase, at) in &run.transitions {
                chart::draw_vline(&mut chart, *at, phase, settings)?;
            }
            if let Some(a) = panel_annotation {
                chart::draw_annotation(&mut chart, a.from, a.to, &a.lines, RED, settings)?;
            }
            chart::draw_legend(&mut chart, settings)?;
        }

        figure
            .present()
            .wrap_err_with(|| format!("Write {}", output.display()))?;
        Ok(output.clone())
    }
}

#[async_trait::async_trait]
impl Plot for GradualOverload {
    fn name(&self) -> &'static str {
        "gradual-overload"
    }

    fn required_inputs(&self) -> Vec<PathBuf> {
        vec![self.metrics_path(), self.phases_path()]
    }

    async fn plot(&self, settings: &Settings) -> Result<()> {
        let run = self.load().await?;
        let output = self.render(&run, settings)?;
        info!("Wrote gradual overload visualization to {}", output.display());
        println!("Visualization written to {}", output.display());
        println!("\n{}", Summary::new(&run.metrics));
        Ok(())
    }
}
