use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    Backend, Endpoint, Error, Handle, OutputTensor, Result, SavedModel, TensorBuffer,
};

/// Names an operation output inside a graph, e.g. `StatefulPartitionedCall:0`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationEndpoint {
    pub operation: String,
    #[serde(default)]
    pub index: usize,
}

impl OperationEndpoint {
    pub fn new(operation: impl Into<String>, index: usize) -> Self {
        Self {
            operation: operation.into(),
            index,
        }
    }
}

impl fmt::Display for OperationEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.operation, self.index)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Unloaded,
    Loaded,
    Ready,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Unloaded => "unloaded",
            SessionState::Loaded => "loaded",
            SessionState::Ready => "ready",
            SessionState::Closed => "closed",
        };
        f.write_str(s)
    }
}

// Field order is drop order: the session goes back to the engine before the
// graph it is bound to.
struct Handles<B: Backend> {
    session: Handle<B::Session>,
    graph: Handle<B::Graph>,
}

impl<B: Backend> Handles<B> {
    fn release(&mut self) {
        self.session.release();
        self.graph.release();
    }
}

struct Endpoints<Op> {
    input: Endpoint<Op>,
    output: Endpoint<Op>,
}

/// Lifecycle of one loaded graph and its runnable session.
///
/// `Unloaded -> Loaded -> Ready -> Closed`. The session owns every native
/// handle it acquires and releases them (session first, then graph) exactly
/// once, either in [`close`](Self::close) or when dropped.
///
/// Not thread-safe: `run` takes `&mut self`, so sharing a session across
/// threads requires external locking.
pub struct InferenceSession<B: Backend> {
    backend: B,
    state: SessionState,
    endpoints: Option<Endpoints<B::Operation>>,
    handles: Option<Handles<B>>,
}

impl<B: Backend> InferenceSession<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: SessionState::Unloaded,
            endpoints: None,
            handles: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Acquires the graph and session for `model`.
    ///
    /// On failure the session stays `Unloaded` and any handle acquired before
    /// the failing step has already been released.
    pub fn load(&mut self, model: &SavedModel) -> Result<()> {
        self.expect_state(SessionState::Unloaded, "unloaded")?;

        if !model.dir.is_dir() {
            return Err(Error::model_load(
                &model.dir,
                "saved-model directory does not exist",
            ));
        }
        if model.tags.is_empty() {
            return Err(Error::model_load(&model.dir, "empty tag set"));
        }

        let mut graph = Handle::new(
            self.backend
                .new_graph()
                .map_err(|status| Error::model_load(&model.dir, status.message))?,
        );
        let session = {
            let Some(graph) = graph.get_mut() else {
                return Err(Error::model_load(&model.dir, "graph handle was released"));
            };
            self.backend
                .load_session(graph, model)
                .map_err(|status| Error::model_load(&model.dir, status.message))?
        };

        info!(
            backend = self.backend.name(),
            dir = %model.dir.display(),
            tags = ?model.tags,
            "loaded saved model"
        );
        self.handles = Some(Handles {
            session: Handle::new(session),
            graph,
        });
        self.state = SessionState::Loaded;
        Ok(())
    }

    /// Looks up both endpoints in the loaded graph and caches them.
    ///
    /// If either name is missing the session stays `Loaded`.
    pub fn resolve_endpoints(
        &mut self,
        input: &OperationEndpoint,
        output: &OperationEndpoint,
    ) -> Result<()> {
        self.expect_state(SessionState::Loaded, "loaded")?;
        let graph = self
            .handles
            .as_ref()
            .and_then(|h| h.graph.get())
            .ok_or(Error::InvalidState {
                state: self.state,
                expected: "loaded",
            })?;

        let input = resolve(&self.backend, graph, input)?;
        let output = resolve(&self.backend, graph, output)?;
        debug!(
            input = %input.name,
            output = %output.name,
            "resolved graph endpoints"
        );

        self.endpoints = Some(Endpoints { input, output });
        self.state = SessionState::Ready;
        Ok(())
    }

    /// Runs the graph on `input` and returns an owned copy of its output.
    ///
    /// The engine's output tensor is released before this returns, on both
    /// the success and the error path. The output shape is not checked here;
    /// decoders validate it.
    pub fn run(&mut self, input: &TensorBuffer) -> Result<TensorBuffer> {
        let state = self.state;
        let not_ready = || Error::InvalidState {
            state,
            expected: "ready",
        };
        if state != SessionState::Ready {
            return Err(not_ready());
        }

        let (Some(handles), Some(endpoints)) = (self.handles.as_mut(), self.endpoints.as_ref())
        else {
            return Err(not_ready());
        };
        let (Some(session), Some(graph)) = (handles.session.get_mut(), handles.graph.get()) else {
            return Err(not_ready());
        };

        let output = self
            .backend
            .run(
                session,
                graph,
                &endpoints.input,
                input.as_raw(),
                &endpoints.output,
            )
            .map_err(Error::run)?;

        let copied = TensorBuffer::from_raw(output.data(), output.shape());
        Handle::new(output).release();
        copied
    }

    /// Releases the session handle, then the graph handle. Idempotent.
    pub fn close(&mut self) {
        self.endpoints = None;
        if let Some(mut handles) = self.handles.take() {
            handles.release();
            info!(backend = self.backend.name(), "closed inference session");
        }
        self.state = SessionState::Closed;
    }

    fn expect_state(&self, wanted: SessionState, expected: &'static str) -> Result<()> {
        if self.state == wanted {
            Ok(())
        } else {
            Err(Error::InvalidState {
                state: self.state,
                expected,
            })
        }
    }
}

impl<B: Backend> Drop for InferenceSession<B> {
    fn drop(&mut self) {
        self.close();
    }
}

fn resolve<B: Backend>(
    backend: &B,
    graph: &B::Graph,
    endpoint: &OperationEndpoint,
) -> Result<Endpoint<B::Operation>> {
    // A lookup the engine cannot answer is reported the same as a missing name.
    let not_found = || Error::EndpointNotFound {
        name: endpoint.operation.clone(),
    };
    let operation = backend
        .operation(graph, &endpoint.operation)
        .map_err(|status| {
            warn!(
                operation = %endpoint.operation,
                %status,
                "engine failed to look up operation"
            );
            not_found()
        })?
        .ok_or_else(not_found)?;

    Ok(Endpoint {
        name: endpoint.operation.clone(),
        index: endpoint.index,
        operation,
    })
}

impl<B: Backend> fmt::Debug for InferenceSession<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InferenceSession")
            .field("backend", &self.backend.name())
            .field("state", &self.state)
            .finish()
    }
}

