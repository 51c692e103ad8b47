//! Error taxonomy for the inference session adapter.
//!
//! Every failure reported by the native engine is translated into one of
//! these variants at the backend boundary, with the engine's message kept
//! verbatim.

use std::path::PathBuf;

use thiserror::Error;

use crate::{EngineStatus, SessionState};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The saved model could not be loaded: bad path, unknown tag set, or a
    /// non-OK engine status.
    #[error("failed to load model from {}: {message}", .path.display())]
    ModelLoad { path: PathBuf, message: String },

    /// A named operation does not exist in the loaded graph.
    #[error("operation `{name}` not found in graph")]
    EndpointNotFound { name: String },

    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// Element count disagrees with the product of the shape.
    #[error("buffer holds {actual} elements but its shape requires {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    /// The engine reported a non-OK status while executing the graph.
    #[error("graph execution failed ({code}): {message}")]
    Run { code: String, message: String },

    #[error("model produced an empty output")]
    EmptyOutput,

    #[error("session is {state}, operation requires {expected}")]
    InvalidState {
        state: SessionState,
        expected: &'static str,
    },
}

impl Error {
    pub fn model_load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ModelLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn run(status: EngineStatus) -> Self {
        Self::Run {
            code: status.code,
            message: status.message,
        }
    }
}
