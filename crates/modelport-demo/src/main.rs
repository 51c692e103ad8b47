mod cli;
mod image_io;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command, CommonArgs};
use modelport_backend_tf::TfBackend;
use modelport_core::{
    Backend, ImagePixels, InferenceSession, ResultDecoder, TaskConfig, TensorBuffer,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cli.log).context("invalid --log filter")?)
        .init();

    match cli.command {
        Command::SuperResolution { common, output } => super_resolution(common, output),
        Command::Classify { common } => classify(common),
    }
}

fn super_resolution(args: CommonArgs, output_path: PathBuf) -> Result<()> {
    let config = task_config(&args, |dir| TaskConfig::super_resolution(dir))?;
    let decoder = config
        .super_resolution_decoder()
        .context("task config does not describe a super-resolution model")?;

    let output = infer(&config, &args)?;
    let grid = decoder.decode(&output)?;

    image_io::save(&grid, args.channels, &output_path)?;
    println!(
        "wrote {}x{} image to {}",
        grid.width,
        grid.height,
        output_path.display()
    );
    Ok(())
}

fn classify(args: CommonArgs) -> Result<()> {
    let config = task_config(&args, |dir| TaskConfig::flower_classification(dir))?;
    let decoder = config
        .classification_decoder()
        .context("task config does not describe a classification model")?;

    let output = infer(&config, &args)?;
    let result = decoder.decode(&output)?;

    let probabilities = result.probabilities();
    for ((label, score), p) in decoder.labels().iter().zip(&result.scores).zip(&probabilities) {
        println!("{label:>12}: score {score:>10.4}  p {p:.4}");
    }
    println!(
        "prediction: {} ({:.2}% confidence)",
        result.label,
        probabilities[result.index] * 100.0
    );
    Ok(())
}

fn task_config(args: &CommonArgs, preset: fn(PathBuf) -> TaskConfig) -> Result<TaskConfig> {
    let mut config = match &args.config {
        Some(path) => TaskConfig::from_json_file(path)?,
        None => preset(args.model_dir.clone()),
    };
    config.model.dir = args.model_dir.clone();
    Ok(config)
}

/// Loads the model, feeds the image through it once and closes the session.
fn infer(config: &TaskConfig, args: &CommonArgs) -> Result<TensorBuffer> {
    let backend = TfBackend::new();
    tracing::info!(engine = backend.name(), version = %backend.version(), "starting");

    let image = image_io::load(&args.image, args.channels)?;
    let input = TensorBuffer::from_image(
        &ImagePixels {
            data: &image.data,
            height: image.height,
            width: image.width,
            channels: image.channels,
        },
        &config.input_spec,
    )
    .with_context(|| format!("{} does not fit the model input", args.image.display()))?;

    let mut session = InferenceSession::new(backend);
    session.load(&config.model)?;
    session.resolve_endpoints(&config.input, &config.output)?;
    let output = session.run(&input)?;
    session.close();

    Ok(output)
}
