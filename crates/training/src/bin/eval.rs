use clap::Parser;
use training::{run_eval, EvalArgs};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let (cfg, checkpoint, fold) = EvalArgs::parse().into_config()?;
    let stats = run_eval(&cfg, &checkpoint, fold)?;
    println!(
        "fold {fold}: loss {:.4} grasp accuracy {:.4} over {} samples",
        stats.loss, stats.accuracy, stats.samples
    );
    Ok(())
}
