use anyhow::Result;
use clap::Parser;
use isodef_rs::{cli, pipeline};
use mimalloc::MiMalloc;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> Result<()> {
    let args = cli::Args::parse();

    // Initialize tracing subscriber
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            if args.quiet {
                EnvFilter::new("warn")
            } else {
                EnvFilter::new("info")
            }
        });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    let stats = pipeline::run(&args)?;
    tracing::info!(
        loci = stats.loci,
        parallel = stats.schedule.parallel_done,
        retried = stats.schedule.retried_done,
        failed = stats.schedule.failed.len(),
        isoforms = stats.isoforms,
        reads = stats.assigned_reads,
        "isodef-rs: processing complete"
    );
    Ok(())
}
