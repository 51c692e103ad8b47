//! Interpretation of raw output tensors per task.

use crate::{Error, Result, Shape, TensorBuffer};

pub trait ResultDecoder {
    type Output;

    /// Validates the output shape, then reinterprets the buffer.
    fn decode(&self, output: &TensorBuffer) -> Result<Self::Output>;
}

/// Dense `height x width x channels` image, row-major and channel-last.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelGrid {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
    pub data: Vec<f32>,
}

impl PixelGrid {
    /// Channel samples of the pixel at (`row`, `col`).
    pub fn pixel(&self, row: usize, col: usize) -> Option<&[f32]> {
        if row >= self.height || col >= self.width {
            return None;
        }
        let start = (row * self.width + col) * self.channels;
        self.data.get(start..start + self.channels)
    }
}

/// Expects a `[1, height, width, channels]` output in the input's layout.
#[derive(Clone, Debug)]
pub struct SuperResolutionDecoder {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl SuperResolutionDecoder {
    pub fn new(height: usize, width: usize, channels: usize) -> Self {
        Self {
            height,
            width,
            channels,
        }
    }

    fn expected_shape(&self) -> Shape {
        Shape::from_slice(&[1, self.height, self.width, self.channels])
    }
}

impl Default for SuperResolutionDecoder {
    fn default() -> Self {
        Self::new(128, 128, 3)
    }
}

impl ResultDecoder for SuperResolutionDecoder {
    type Output = PixelGrid;

    fn decode(&self, output: &TensorBuffer) -> Result<PixelGrid> {
        let expected = self.expected_shape();
        if output.shape() != &expected {
            return Err(Error::ShapeMismatch {
                expected: expected.to_string(),
                actual: output.shape().to_string(),
            });
        }

        Ok(PixelGrid {
            height: self.height,
            width: self.width,
            channels: self.channels,
            data: output.data().to_vec(),
        })
    }
}

/// Predicted class together with the full score vector.
#[derive(Clone, Debug, PartialEq)]
pub struct Classification {
    pub index: usize,
    pub label: String,
    pub scores: Vec<f32>,
}

impl Classification {
    /// Score of the predicted class, `None` if `index` is outside `scores`.
    pub fn score(&self) -> Option<f32> {
        self.scores.get(self.index).copied()
    }

    /// Softmax over the raw scores, for models that emit logits.
    pub fn probabilities(&self) -> Vec<f32> {
        let max = self
            .scores
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max);
        let exps: Vec<f32> = self.scores.iter().map(|s| (s - max).exp()).collect();
        let sum: f32 = exps.iter().sum();
        exps.into_iter().map(|e| e / sum).collect()
    }
}

/// Expects a `[1, K]` score vector, one entry per label.
#[derive(Clone, Debug)]
pub struct ClassificationDecoder {
    labels: Vec<String>,
}

impl ClassificationDecoder {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

impl ResultDecoder for ClassificationDecoder {
    type Output = Classification;

    fn decode(&self, output: &TensorBuffer) -> Result<Classification> {
        let dims = output.shape().dims();
        if dims.len() != 2 || dims[0] != 1 {
            return Err(Error::ShapeMismatch {
                expected: "[1, K]".to_string(),
                actual: output.shape().to_string(),
            });
        }
        let scores = output.data();
        if scores.is_empty() {
            return Err(Error::EmptyOutput);
        }
        if scores.len() != self.labels.len() {
            return Err(Error::ShapeMismatch {
                expected: Shape::from_slice(&[1, self.labels.len()]).to_string(),
                actual: output.shape().to_string(),
            });
        }

        let index = argmax(scores);
        Ok(Classification {
            index,
            label: self.labels[index].clone(),
            scores: scores.to_vec(),
        })
    }
}

/// Index of the largest value. Only a strictly greater value replaces the
/// current best, so ties go to the earliest index. NaN entries are skipped;
/// an all-NaN or empty slice yields 0.
pub fn argmax(scores: &[f32]) -> usize {
    let mut best: Option<(usize, f32)> = None;
    for (i, &s) in scores.iter().enumerate() {
        if s.is_nan() {
            continue;
        }
        match best {
            Some((_, top)) if s <= top => {}
            _ => best = Some((i, s)),
        }
    }
    best.map_or(0, |(i, _)| i)
}
