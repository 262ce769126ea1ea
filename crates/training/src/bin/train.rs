use clap::Parser;
use training::{run_train, TrainArgs};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cfg = TrainArgs::parse().into_config()?;
    let report = run_train(&cfg, None)?;
    for fold in &report.folds {
        println!(
            "fold {}: final val accuracy {:.4} (best {:.4} at epoch {})",
            fold.fold, fold.final_val_accuracy, fold.best_val_accuracy, fold.best_epoch
        );
    }
    println!("mean val accuracy {:.4}", report.mean_val_accuracy);
    Ok(())
}
