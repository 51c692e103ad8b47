use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ClassificationDecoder, OperationEndpoint, SavedModel, SuperResolutionDecoder};

/// Label order of the five-class flower photos dataset.
pub const FLOWER_LABELS: [&str; 5] = ["daisy", "dandelion", "roses", "sunflowers", "tulips"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read task config {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid task config")]
    Json(#[from] serde_json::Error),
}

/// Spatial size the model's input endpoint was exported with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSpec {
    pub height: usize,
    pub width: usize,
    #[serde(default = "default_channels")]
    pub channels: usize,
    /// Scale 0..255 samples into 0..1 before feeding. Off by default: the
    /// exported models were fed raw pixel values.
    #[serde(default)]
    pub normalize: bool,
}

impl InputSpec {
    pub fn rgb(height: usize, width: usize) -> Self {
        Self {
            height,
            width,
            channels: 3,
            normalize: false,
        }
    }
}

fn default_channels() -> usize {
    3
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskKind {
    SuperResolution {
        height: usize,
        width: usize,
        #[serde(default = "default_channels")]
        channels: usize,
    },
    Classification {
        labels: Vec<String>,
    },
}

/// Everything needed to drive one model end to end.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskConfig {
    pub model: SavedModel,
    pub input: OperationEndpoint,
    pub output: OperationEndpoint,
    pub input_spec: InputSpec,
    pub task: TaskKind,
}

impl TaskConfig {
    /// EDSR x4 upscaler: 32x32 RGB in, 128x128 RGB out.
    pub fn super_resolution(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model: SavedModel::serving(model_dir),
            input: OperationEndpoint::new("serving_default_img", 0),
            output: OperationEndpoint::new("StatefulPartitionedCall", 0),
            input_spec: InputSpec::rgb(32, 32),
            task: TaskKind::SuperResolution {
                height: 128,
                width: 128,
                channels: 3,
            },
        }
    }

    /// Five-class flower classifier on 180x180 RGB input.
    pub fn flower_classification(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model: SavedModel::serving(model_dir),
            input: OperationEndpoint::new("serving_default_rescaling_input", 0),
            output: OperationEndpoint::new("StatefulPartitionedCall", 0),
            input_spec: InputSpec::rgb(180, 180),
            task: TaskKind::Classification {
                labels: FLOWER_LABELS.iter().map(|l| l.to_string()).collect(),
            },
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// `None` unless this is a super-resolution task.
    pub fn super_resolution_decoder(&self) -> Option<SuperResolutionDecoder> {
        match &self.task {
            TaskKind::SuperResolution {
                height,
                width,
                channels,
            } => Some(SuperResolutionDecoder::new(*height, *width, *channels)),
            TaskKind::Classification { .. } => None,
        }
    }

    pub fn classification_decoder(&self) -> Option<ClassificationDecoder> {
        match &self.task {
            TaskKind::Classification { labels } => {
                Some(ClassificationDecoder::new(labels.iter().cloned()))
            }
            TaskKind::SuperResolution { .. } => None,
        }
    }
}
