use bench_metrics::BenchMetrics;
use bench_plots::{BenchMetricsCli, USAGE_EXIT_CODE, init_tracing, run};
use clap::Parser;
use eyre::Result;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = BenchMetricsCli::parse();
    let summary = match args.summary_path() {
        Ok(summary) => summary,
        Err(usage) => {
            println!("{usage}");
            std::process::exit(USAGE_EXIT_CODE);
        }
    };
    let _guard = init_tracing(&args.common)?;

    run(&BenchMetrics::new(summary), &args.common).await
}
