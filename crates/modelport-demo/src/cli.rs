use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "modelport-demo", version, about = "Run a saved model on one image")]
pub struct Cli {
    /// Log level (RUST_LOG)
    #[arg(long, global = true, default_value = "info")]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Upscale a low-resolution image 4x
    SuperResolution {
        #[command(flatten)]
        common: CommonArgs,

        /// Where to write the reconstructed image
        #[arg(long, default_value = "sr.png")]
        output: PathBuf,
    },
    /// Predict the flower species shown in an image
    Classify {
        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args, Debug)]
pub struct CommonArgs {
    /// Saved-model directory
    #[arg(long)]
    pub model_dir: PathBuf,

    /// Input image; must already have the model's input resolution
    #[arg(long)]
    pub image: PathBuf,

    /// JSON task config replacing the built-in preset
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Channel order fed to the model
    #[arg(long, value_enum, default_value_t = ChannelOrder::Bgr)]
    pub channels: ChannelOrder,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ChannelOrder {
    Rgb,
    Bgr,
}
