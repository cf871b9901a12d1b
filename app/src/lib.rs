use std::path::{Path, PathBuf};

use clap::{Args, Parser};
use common::{config::Settings, error::PlotError, plot::Plot};
use eyre::{Context, Result};
use tracing::{debug, error};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter,
    fmt::{layer, time::ChronoLocal},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Crates whose log level follows `RUST_LOG` unless a `--log` directive names them.
const LOG_TARGETS: &[&str] = &["bench_plots", "common", "bench_metrics", "gradual_overload"];

/// Options shared by both binaries.
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// YAML file with render settings
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Tracing filter directive, e.g. `gradual_overload=debug`
    #[arg(short, long)]
    pub log: Vec<String>,
    /// Also write logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

/// Exit status when the summary file argument is missing.
pub const USAGE_EXIT_CODE: i32 = 1;

/// Plot READ/WRITE latency and throughput from a benchmark summary file
#[derive(Parser, Debug)]
#[command(name = "plot-bench-metrics")]
pub struct BenchMetricsCli {
    /// Per-client summary file written by the benchmark
    pub summary: Option<PathBuf>,
    #[command(flatten)]
    pub common: CommonArgs,
}

impl BenchMetricsCli {
    /// The summary file, or the usage error to print before exiting with
    /// [`USAGE_EXIT_CODE`].
    pub fn summary_path(&self) -> Result<PathBuf, PlotError> {
        self.summary
            .clone()
            .ok_or_else(|| PlotError::Usage("plot-bench-metrics <summary.dat>".to_owned()))
    }
}

/// Visualize gradual overload test results
#[derive(Parser, Debug)]
#[command(name = "visualize-gradual-overload")]
pub struct GradualOverloadCli {
    /// Output prefix used by the benchmark (including trailing - if used)
    #[arg(long)]
    pub prefix: String,
    #[command(flatten)]
    pub common: CommonArgs,
}

fn env_filter(log_level: &str, directives: &[String]) -> Result<EnvFilter> {
    let mut filter = EnvFilter::new(log_level);
    for directive in directives {
        filter = filter.add_directive(
            directive
                .parse()
                .wrap_err_with(|| format!("Invalid log directive {directive:?}"))?,
        );
    }
    for target in LOG_TARGETS {
        if !directives.iter().any(|x| x.starts_with(target)) {
            filter = filter.add_directive(format!("{target}={log_level}").parse()?);
        }
    }
    Ok(filter)
}

/// Installs the global subscriber. Keep the returned guard alive until exit
/// so the log file gets flushed.
pub fn init_tracing(args: &CommonArgs) -> Result<Option<WorkerGuard>> {
    let log_level = std::env::var("RUST_LOG").unwrap_or("warn".to_owned());
    let env_filter = env_filter(&log_level, &args.log)?;

    let (file_layer, guard) = match &args.log_file {
        Some(path) => {
            let (dir, name) = split_log_path(path);
            let (non_blocking, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            (
                Some(layer().with_ansi(false).with_writer(non_blocking)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            layer()
                .with_writer(std::io::stderr)
                .with_timer(ChronoLocal::new("%v %k:%M:%S %z".to_owned()))
                .compact(),
        )
        .with(file_layer)
        .init();
    Ok(guard)
}

fn split_log_path(path: &Path) -> (PathBuf, PathBuf) {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let name = path
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("plots.log"));
    (dir, name)
}

/// Loads the render settings and runs `plot`, logging the failure chain.
pub async fn run(plot: &dyn Plot, args: &CommonArgs) -> Result<()> {
    let settings = Settings::load(args.config.as_deref()).await?;
    debug!("Running {} with {settings:?}", plot.name());
    if let Err(err) = common::plot::plot(plot, &settings).await {
        error!("{err:#?}");
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_summary_is_a_usage_error() {
        let cli = BenchMetricsCli::try_parse_from(["plot-bench-metrics"]).unwrap();
        let err = cli.summary_path().unwrap_err();
        assert!(matches!(err, PlotError::Usage(_)));
        assert_eq!(err.to_string(), "Usage: plot-bench-metrics <summary.dat>");
        assert_eq!(USAGE_EXIT_CODE, 1);

        let cli = BenchMetricsCli::try_parse_from([
            "plot-bench-metrics",
            "results/summary.dat",
            "-l",
            "bench_metrics=debug",
        ])
        .unwrap();
        assert_eq!(cli.summary_path().unwrap(), PathBuf::from("results/summary.dat"));
        assert_eq!(cli.common.log, vec!["bench_metrics=debug"]);
    }

    #[test]
    fn prefix_is_required() {
        assert!(GradualOverloadCli::try_parse_from(["visualize-gradual-overload"]).is_err());
        let cli = GradualOverloadCli::try_parse_from([
            "visualize-gradual-overload",
            "--prefix",
            "./results/run-",
            "--config",
            "plots.yaml",
        ])
        .unwrap();
        assert_eq!(cli.prefix, "./results/run-");
        assert_eq!(cli.common.config, Some(PathBuf::from("plots.yaml")));
    }

    #[test]
    fn crate_targets_default_to_log_level() {
        let filter = env_filter("warn", &[]).unwrap().to_string();
        assert!(filter.contains("gradual_overload=warn"), "{filter}");
        assert!(filter.contains("bench_metrics=warn"), "{filter}");
    }

    #[test]
    fn explicit_directive_overrides_target() {
        let filter = env_filter("warn", &["bench_metrics=debug".to_owned()])
            .unwrap()
            .to_string();
        assert!(filter.contains("bench_metrics=debug"), "{filter}");
        assert!(!filter.contains("bench_metrics=warn"), "{filter}");
    }

    #[test]
    fn log_file_defaults_to_current_dir() {
        assert_eq!(
            split_log_path(Path::new("plots.log")),
            (PathBuf::from("."), PathBuf::from("plots.log"))
        );
        assert_eq!(
            split_log_path(Path::new("/tmp/out/run.log")),
            (PathBuf::from("/tmp/out"), PathBuf::from("run.log"))
        );
    }

    #[tokio::test]
    async fn missing_config_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let args = CommonArgs {
            config: Some(dir.path().join("nope.yaml")),
            ..Default::default()
        };
        let plot = bench_metrics::BenchMetrics::new(dir.path().join("summary.dat"));
        assert!(run(&plot, &args).await.is_err());
    }
}
