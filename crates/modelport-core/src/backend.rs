//! The seam between the session adapter and a native inference engine.
//!
//! Engines hand out opaque handles (graph, session, output tensor). Each one
//! implements [`Release`], and the adapter wraps them in [`Handle`] so the
//! native resource is freed exactly once, whether by an explicit release or
//! on drop.

use std::fmt;

use tracing::{debug, warn};

use crate::{SavedModel, Shape, TensorView};

/// Status reported by the engine alongside a failed call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineStatus {
    pub code: String,
    pub message: String,
}

impl EngineStatus {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for EngineStatus {}

/// A native resource that must be handed back to the engine.
pub trait Release {
    /// Short name used in logs, e.g. `"session"`.
    const KIND: &'static str;

    fn release(self) -> Result<(), EngineStatus>;
}

/// (operation, output index) pair where a tensor enters or leaves a graph.
#[derive(Clone, Debug)]
pub struct Endpoint<Op> {
    pub name: String,
    pub index: usize,
    pub operation: Op,
}

/// Engine-owned result of a graph run. Only valid until released.
pub trait OutputTensor: Release {
    fn shape(&self) -> Shape;
    fn data(&self) -> &[f32];
}

pub trait Backend {
    type Graph: Release;
    type Session: Release;
    type Operation: Clone;
    type Output: OutputTensor;

    fn name(&self) -> &'static str;

    /// Version string of the underlying engine library.
    fn version(&self) -> String;

    fn new_graph(&self) -> Result<Self::Graph, EngineStatus>;

    /// Loads `model` into `graph` and binds a runnable session to it.
    fn load_session(
        &self,
        graph: &mut Self::Graph,
        model: &SavedModel,
    ) -> Result<Self::Session, EngineStatus>;

    /// Looks up an operation by name. `Ok(None)` means it does not exist.
    fn operation(
        &self,
        graph: &Self::Graph,
        name: &str,
    ) -> Result<Option<Self::Operation>, EngineStatus>;

    /// Runs the graph synchronously, feeding `tensor` at `input` and fetching
    /// `output`.
    fn run(
        &self,
        session: &mut Self::Session,
        graph: &Self::Graph,
        input: &Endpoint<Self::Operation>,
        tensor: TensorView<'_>,
        output: &Endpoint<Self::Operation>,
    ) -> Result<Self::Output, EngineStatus>;
}

/// Owns a releasable native value and releases it at most once.
pub struct Handle<T: Release> {
    inner: Option<T>,
}

impl<T: Release> Handle<T> {
    pub fn new(inner: T) -> Self {
        Self { inner: Some(inner) }
    }

    pub fn get(&self) -> Option<&T> {
        self.inner.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.inner.as_mut()
    }

    pub fn is_live(&self) -> bool {
        self.inner.is_some()
    }

    /// Hands the value back to the engine. Returns `false` if it had already
    /// been released. A non-OK release status is logged, not propagated.
    pub fn release(&mut self) -> bool {
        let Some(inner) = self.inner.take() else {
            return false;
        };
        match inner.release() {
            Ok(()) => debug!(kind = T::KIND, "released native handle"),
            Err(status) => warn!(kind = T::KIND, %status, "engine failed to release handle"),
        }
        true
    }
}

impl<T: Release> Drop for Handle<T> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T: Release> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("kind", &T::KIND)
            .field("live", &self.is_live())
            .finish()
    }
}
