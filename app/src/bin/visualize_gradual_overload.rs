use bench_plots::{GradualOverloadCli, init_tracing, run};
use clap::Parser;
use eyre::Result;
use gradual_overload::GradualOverload;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = GradualOverloadCli::parse();
    let _guard = init_tracing(&args.common)?;

    run(&GradualOverload::new(args.prefix), &args.common).await
}
