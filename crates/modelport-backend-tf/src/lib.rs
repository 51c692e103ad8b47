use std::os::raw::c_int;

use modelport_core::{
    Backend, EngineStatus, Endpoint, OutputTensor, Release, SavedModel, Shape, TensorView,
};
use tensorflow::{
    Graph, Operation, SavedModelBundle, Session, SessionOptions, SessionRunArgs, Status, Tensor,
};
use tracing::debug;

/// Runs saved models through the TensorFlow C library.
pub struct TfBackend;

impl TfBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TfBackend {
    fn default() -> Self {
        Self::new()
    }
}

pub struct TfGraph(Graph);

pub struct TfSession(Session);

pub struct TfOutput {
    shape: Shape,
    tensor: Tensor<f32>,
}

impl Release for TfGraph {
    const KIND: &'static str = "graph";

    fn release(self) -> Result<(), EngineStatus> {
        drop(self.0);
        Ok(())
    }
}

impl Release for TfSession {
    const KIND: &'static str = "session";

    fn release(mut self) -> Result<(), EngineStatus> {
        // Close explicitly so a failing close surfaces as a status; the
        // delete on drop would swallow it.
        self.0.close().map_err(engine_status)
    }
}

impl Release for TfOutput {
    const KIND: &'static str = "output tensor";

    fn release(self) -> Result<(), EngineStatus> {
        drop(self.tensor);
        Ok(())
    }
}

impl OutputTensor for TfOutput {
    fn shape(&self) -> Shape {
        self.shape.clone()
    }

    fn data(&self) -> &[f32] {
        &self.tensor
    }
}

impl Backend for TfBackend {
    type Graph = TfGraph;
    type Session = TfSession;
    type Operation = Operation;
    type Output = TfOutput;

    fn name(&self) -> &'static str {
        "tensorflow"
    }

    fn version(&self) -> String {
        tensorflow::version().unwrap_or_else(|_| "unknown".to_string())
    }

    fn new_graph(&self) -> Result<TfGraph, EngineStatus> {
        Ok(TfGraph(Graph::new()))
    }

    fn load_session(
        &self,
        graph: &mut TfGraph,
        model: &SavedModel,
    ) -> Result<TfSession, EngineStatus> {
        let options = SessionOptions::new();
        let bundle = SavedModelBundle::load(&options, &model.tags, &mut graph.0, &model.dir)
            .map_err(engine_status)?;
        debug!(dir = %model.dir.display(), "saved model bundle loaded");
        Ok(TfSession(bundle.session))
    }

    fn operation(
        &self,
        graph: &TfGraph,
        name: &str,
    ) -> Result<Option<Operation>, EngineStatus> {
        graph.0.operation_by_name(name).map_err(engine_status)
    }

    fn run(
        &self,
        session: &mut TfSession,
        _graph: &TfGraph,
        input: &Endpoint<Operation>,
        tensor: TensorView<'_>,
        output: &Endpoint<Operation>,
    ) -> Result<TfOutput, EngineStatus> {
        let input_tensor = Tensor::<f32>::new(&tensor.shape.dims_u64())
            .with_values(tensor.data)
            .map_err(engine_status)?;

        let mut args = SessionRunArgs::new();
        args.add_feed(&input.operation, endpoint_index(input)?, &input_tensor);
        let token = args.request_fetch(&output.operation, endpoint_index(output)?);

        session.0.run(&mut args).map_err(engine_status)?;
        let fetched: Tensor<f32> = args.fetch(token).map_err(engine_status)?;

        let shape = Shape::from_dims(fetched.dims()).ok_or_else(|| {
            EngineStatus::new("OUT_OF_RANGE", "output dimensions do not fit in usize")
        })?;
        Ok(TfOutput {
            shape,
            tensor: fetched,
        })
    }
}

fn endpoint_index(endpoint: &Endpoint<Operation>) -> Result<c_int, EngineStatus> {
    c_int::try_from(endpoint.index).map_err(|_| {
        EngineStatus::new(
            "INVALID_ARGUMENT",
            format!("output index {} of `{}` is out of range", endpoint.index, endpoint.name),
        )
    })
}

fn engine_status(status: Status) -> EngineStatus {
    let message = match status.message() {
        Ok(message) => message.to_string(),
        Err(_) => status.to_string(),
    };
    EngineStatus::new(format!("{:?}", status.code()), message)
}
