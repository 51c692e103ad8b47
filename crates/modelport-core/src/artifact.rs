use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const SERVE_TAG: &str = "serve";

/// A saved-model directory plus the tag set selecting the graph variant to
/// load from it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedModel {
    pub dir: PathBuf,
    #[serde(default = "default_tags")]
    pub tags: Vec<String>,
}

impl SavedModel {
    pub fn new<I, S>(dir: impl Into<PathBuf>, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            dir: dir.into(),
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    /// The `{"serve"}` variant written by the standard serving export.
    pub fn serving(dir: impl Into<PathBuf>) -> Self {
        Self::new(dir, [SERVE_TAG])
    }
}

fn default_tags() -> Vec<String> {
    vec![SERVE_TAG.to_string()]
}
