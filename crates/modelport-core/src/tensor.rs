use std::fmt;

use smallvec::SmallVec;

use crate::{Error, InputSpec, Result};

/// Ordered dimensions of a tensor, batch first.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Shape(pub SmallVec<[usize; 6]>);

impl Shape {
    pub fn from_slice(d: &[usize]) -> Self {
        Self(d.iter().copied().collect())
    }

    /// Builds a shape from the signed dimensions native engines report.
    /// Returns `None` if any dimension is negative (unknown).
    pub fn from_dims<D>(dims: &[D]) -> Option<Self>
    where
        D: Copy + TryInto<usize>,
    {
        dims.iter()
            .map(|d| (*d).try_into().ok())
            .collect::<Option<SmallVec<[usize; 6]>>>()
            .map(Self)
    }

    pub fn rank(&self) -> usize {
        self.0.len()
    }

    /// Element count, or `None` if the product of the dimensions overflows.
    pub fn numel(&self) -> Option<usize> {
        self.0.iter().try_fold(1usize, |acc, d| acc.checked_mul(*d))
    }

    fn checked_numel(&self) -> Result<usize> {
        self.numel().ok_or_else(|| Error::ShapeMismatch {
            expected: "a shape whose element count fits in usize".to_string(),
            actual: self.to_string(),
        })
    }

    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    pub fn dims_u64(&self) -> Vec<u64> {
        self.0.iter().map(|d| *d as u64).collect()
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}

/// A decoded image as handed over by an image source: dense, row-major,
/// channel-last f32 samples.
#[derive(Clone, Copy, Debug)]
pub struct ImagePixels<'a> {
    pub data: &'a [f32],
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

/// Owned, immutable f32 tensor.
///
/// `data.len()` always equals the shape's element count and the rank is at least one.
#[derive(Clone, Debug, PartialEq)]
pub struct TensorBuffer {
    shape: Shape,
    data: Vec<f32>,
}

/// Borrowed view of a [`TensorBuffer`], suitable for feeding an engine
/// without copying.
#[derive(Clone, Copy, Debug)]
pub struct TensorView<'a> {
    pub data: &'a [f32],
    pub shape: &'a Shape,
}

impl TensorView<'_> {
    pub fn byte_len(&self) -> usize {
        std::mem::size_of_val(self.data)
    }
}

impl TensorBuffer {
    pub fn new(shape: Shape, data: Vec<f32>) -> Result<Self> {
        if shape.rank() == 0 {
            return Err(Error::ShapeMismatch {
                expected: "a shape of rank >= 1".to_string(),
                actual: shape.to_string(),
            });
        }
        let expected = shape.checked_numel()?;
        if expected != data.len() {
            return Err(Error::LengthMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// Builds a batch-of-one `[1, height, width, channels]` input tensor.
    ///
    /// The image must already have the spatial size the model expects; no
    /// resizing happens here. Samples are copied verbatim unless
    /// `spec.normalize` is set, in which case they are scaled by 1/255.
    pub fn from_image(image: &ImagePixels<'_>, spec: &InputSpec) -> Result<Self> {
        if image.height != spec.height
            || image.width != spec.width
            || image.channels != spec.channels
        {
            return Err(Error::ShapeMismatch {
                expected: Shape::from_slice(&[spec.height, spec.width, spec.channels]).to_string(),
                actual: Shape::from_slice(&[image.height, image.width, image.channels])
                    .to_string(),
            });
        }

        let shape = Shape::from_slice(&[1, image.height, image.width, image.channels]);
        let expected = shape.checked_numel()?;
        if image.data.len() != expected {
            return Err(Error::LengthMismatch {
                expected,
                actual: image.data.len(),
            });
        }

        let data = if spec.normalize {
            image.data.iter().map(|v| v / 255.0).collect()
        } else {
            image.data.to_vec()
        };

        Ok(Self { shape, data })
    }

    /// Copies `data` out of engine-owned memory. The returned buffer keeps
    /// no reference to `data`.
    pub fn from_raw(data: &[f32], shape: Shape) -> Result<Self> {
        let expected = shape.checked_numel()?;
        if data.len() != expected {
            return Err(Error::LengthMismatch {
                expected,
                actual: data.len(),
            });
        }
        Self::new(shape, data.to_vec())
    }

    pub fn as_raw(&self) -> TensorView<'_> {
        TensorView {
            data: &self.data,
            shape: &self.shape,
        }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }
}
