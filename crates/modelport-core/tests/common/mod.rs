//! In-process stand-in for a native engine.
//!
//! Graph and session handles log their release into a shared event list so
//! tests can check ordering and exactly-once release. `run` upsamples a
//! `[1, h, w, c]` input by nearest neighbor.

#![allow(dead_code)]

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use modelport_core::{
    Backend, EngineStatus, Endpoint, OutputTensor, Release, SavedModel, Shape, TensorView,
};

pub type Events = Rc<RefCell<Vec<String>>>;

pub fn model_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

#[derive(Clone)]
pub struct StubBackend {
    pub events: Events,
    pub operations: Vec<String>,
    pub scale: usize,
    pub fail_session: bool,
    pub fail_run: bool,
    /// Session release reports a non-OK status.
    pub fail_release: bool,
    /// Operation lookup reports a non-OK status.
    pub fail_lookup: bool,
    pub runs: Rc<RefCell<usize>>,
    /// Replaces the upsampled output when set.
    pub canned_output: Option<(Vec<usize>, Vec<f32>)>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self {
            events: Rc::default(),
            operations: vec!["in".to_string(), "out".to_string()],
            scale: 4,
            fail_session: false,
            fail_run: false,
            fail_release: false,
            fail_lookup: false,
            runs: Rc::default(),
            canned_output: None,
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }

    pub fn runs(&self) -> usize {
        *self.runs.borrow()
    }

    fn log(&self, event: &str) {
        self.events.borrow_mut().push(event.to_string());
    }
}

pub struct StubGraph {
    events: Events,
    loaded: bool,
}

impl Release for StubGraph {
    const KIND: &'static str = "graph";

    fn release(self) -> Result<(), EngineStatus> {
        self.events.borrow_mut().push("release graph".to_string());
        Ok(())
    }
}

pub struct StubSession {
    events: Events,
    fail_release: bool,
}

impl Release for StubSession {
    const KIND: &'static str = "session";

    fn release(self) -> Result<(), EngineStatus> {
        self.events.borrow_mut().push("release session".to_string());
        if self.fail_release {
            return Err(EngineStatus::new("INTERNAL", "session close failed"));
        }
        Ok(())
    }
}

pub struct StubOutput {
    events: Events,
    shape: Shape,
    data: Vec<f32>,
}

impl Release for StubOutput {
    const KIND: &'static str = "output";

    fn release(self) -> Result<(), EngineStatus> {
        self.events.borrow_mut().push("release output".to_string());
        Ok(())
    }
}

impl OutputTensor for StubOutput {
    fn shape(&self) -> Shape {
        self.shape.clone()
    }

    fn data(&self) -> &[f32] {
        &self.data
    }
}

impl Backend for StubBackend {
    type Graph = StubGraph;
    type Session = StubSession;
    type Operation = String;
    type Output = StubOutput;

    fn name(&self) -> &'static str {
        "stub"
    }

    fn version(&self) -> String {
        "0.0.0-stub".to_string()
    }

    fn new_graph(&self) -> Result<StubGraph, EngineStatus> {
        self.log("acquire graph");
        Ok(StubGraph {
            events: self.events.clone(),
            loaded: false,
        })
    }

    fn load_session(
        &self,
        graph: &mut StubGraph,
        model: &SavedModel,
    ) -> Result<StubSession, EngineStatus> {
        if self.fail_session {
            return Err(EngineStatus::new("INTERNAL", "stub refused to create session"));
        }
        if !model.tags.iter().any(|t| t == "serve") {
            return Err(EngineStatus::new(
                "NOT_FOUND",
                "Could not find meta graph def matching supplied tags",
            ));
        }
        graph.loaded = true;
        self.log("acquire session");
        Ok(StubSession {
            events: self.events.clone(),
            fail_release: self.fail_release,
        })
    }

    fn operation(&self, graph: &StubGraph, name: &str) -> Result<Option<String>, EngineStatus> {
        if !graph.loaded {
            return Err(EngineStatus::new("FAILED_PRECONDITION", "graph is empty"));
        }
        if self.fail_lookup {
            return Err(EngineStatus::new("INTERNAL", "graph lookup failed"));
        }
        Ok(self.operations.iter().find(|op| *op == name).cloned())
    }

    fn run(
        &self,
        _session: &mut StubSession,
        _graph: &StubGraph,
        _input: &Endpoint<String>,
        tensor: TensorView<'_>,
        _output: &Endpoint<String>,
    ) -> Result<StubOutput, EngineStatus> {
        *self.runs.borrow_mut() += 1;
        if self.fail_run {
            return Err(EngineStatus::new(
                "INVALID_ARGUMENT",
                "input to reshape is a tensor with 0 values",
            ));
        }

        let (shape, data) = match &self.canned_output {
            Some((dims, data)) => (Shape::from_slice(dims), data.clone()),
            None => upsample(tensor, self.scale),
        };
        Ok(StubOutput {
            events: self.events.clone(),
            shape,
            data,
        })
    }
}

fn upsample(tensor: TensorView<'_>, scale: usize) -> (Shape, Vec<f32>) {
    let dims = tensor.shape.dims();
    let (h, w, c) = (dims[1], dims[2], dims[3]);
    let (oh, ow) = (h * scale, w * scale);

    let mut out = Vec::with_capacity(oh * ow * c);
    for y in 0..oh {
        for x in 0..ow {
            let src = ((y / scale) * w + x / scale) * c;
            out.extend_from_slice(&tensor.data[src..src + c]);
        }
    }
    (Shape::from_slice(&[1, oh, ow, c]), out)
}
