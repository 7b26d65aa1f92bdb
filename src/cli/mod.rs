// ============================================================
// CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction; parsing only, all work
// is delegated to the application layer.
//
// Two commands:
//   1. `train` — train a CTC acoustic model on the archive
//   2. `eval`  — decode a split with a saved model and report
//                the label error rate

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvalArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "timit-ctc",
    version,
    about = "Train and evaluate CTC acoustic models on the TIMIT corpus."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args) => run_train(args),
            Commands::Eval(args) => run_eval(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::{TrainConfig, TrainUseCase};

    let config: TrainConfig = args.try_into()?;
    tracing::info!("starting training run in '{}'", config.save);

    TrainUseCase::new(config).execute()?;
    println!("Training complete.");
    Ok(())
}

fn run_eval(args: EvalArgs) -> Result<()> {
    use crate::application::eval_use_case::{EvalConfig, EvalUseCase};

    let config: EvalConfig = args.into();
    tracing::info!("evaluating '{}' on split '{}'", config.model_dir, config.split);

    EvalUseCase::new(config).execute()
}
