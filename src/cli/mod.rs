// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses the command line with clap and hands a config to the
// matching use case. Nothing here touches tensors or files.
//
// Three commands are supported:
//   1. `train`           — train, optionally resuming a checkpoint
//   2. `validation-test` — evaluate on the labelled val split
//   3. `test-batch`      — run the test split into reconstruction
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvalArgs, TrainArgs};

use crate::application::evaluate_use_case::{EvalTask, EvaluateUseCase};
use crate::application::train_use_case::TrainUseCase;

#[derive(Parser, Debug)]
#[command(
    name = "floorplan-heatmaps",
    version,
    about = "Train a floor-plan heatmap model and feed its heatmaps to reconstruction."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the use case for the chosen subcommand.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)          => run_train(args),
            Commands::ValidationTest(args) => run_eval(args, EvalTask::ValidationTest),
            Commands::TestBatch(args)      => run_eval(args, EvalTask::TestBatch),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    tracing::info!("Starting training on data in: {}", args.data_dir);

    let report = TrainUseCase::new(args.into()).execute()?;
    match report.best_loss {
        Some(best) => println!("Training complete. {} epochs run, best epoch-mean loss {:.5}.", report.epochs.len(), best),
        None => println!("Training complete. {} epochs run.", report.epochs.len()),
    }
    Ok(())
}

fn run_eval(args: EvalArgs, task: EvalTask) -> Result<()> {
    let output = args.test_dir.clone();
    let report = EvaluateUseCase::new(args.into_config(task)).execute()?;

    println!("Wrote reconstruction inputs for {} samples to '{}'.", report.samples, output);
    if let Some(loss) = report.mean_loss {
        println!("Mean loss: {} (total {:.5})", loss, loss.total());
    }
    Ok(())
}
