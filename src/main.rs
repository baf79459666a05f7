use anyhow::{ensure, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cutout_crop::{
    config::{default_single_output, Config, Mode},
    CutoutProcessor, OnnxRemover,
};

fn main() -> Result<()> {
    let config = Config::parse();
    init_tracing(config.verbose);

    // check inputs before paying for the model load
    config.mode.check_input()?;
    ensure!(
        config.model_path.exists(),
        "Model path does not exist: {}",
        config.model_path.display()
    );

    let remover = OnnxRemover::new(&config.model_path, config.device_id)
        .context("Failed to load the background removal model")?;
    let processor = CutoutProcessor::from_config(remover, &config);

    match &config.mode {
        Mode::Single { input, output } => {
            let output = output
                .clone()
                .unwrap_or_else(|| default_single_output(input));
            processor
                .process_single(input, &output)
                .with_context(|| format!("failed to process {}", input.display()))?;
        }
        Mode::Batch {
            input_dir,
            output_dir,
            ..
        } => {
            let summary = processor.process_directory(input_dir, output_dir)?;
            summary.log_report();
            ensure!(
                summary.is_success(),
                "{} of {} images failed",
                summary.failed.len(),
                summary.total()
            );
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
