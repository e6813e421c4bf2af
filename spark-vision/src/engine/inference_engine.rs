use crate::engine::runtime::Runtime;
use crate::engine::{InferenceBackend, TensorInput, TensorOutputs};
use crate::error::VisionError;
use anyhow::Result;
use log::debug;
use ort::execution_providers::{
    CPUExecutionProvider, CUDAExecutionProvider, ExecutionProviderDispatch,
    TensorRTExecutionProvider,
};
use ort::session::{Session, SessionInputValue};
use ort::value::TensorRef;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct OnnxSession {
    pub(crate) session: Mutex<Session>,
    pub(crate) executor: ExecutionProvider,
    model: PathBuf,
    _runtime: Arc<Runtime>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionProvider {
    #[default]
    CPU,
    CUDA(i32),
    TensorRT(i32),
}

impl ExecutionProvider {
    fn dispatch(self, cpu_mem_arena: bool) -> ExecutionProviderDispatch {
        match self {
            ExecutionProvider::CUDA(id) => CUDAExecutionProvider::default()
                .with_device_id(id)
                .build()
                .error_on_failure(),
            ExecutionProvider::TensorRT(id) => TensorRTExecutionProvider::default()
                .with_device_id(id)
                .build()
                .error_on_failure(),
            ExecutionProvider::CPU => CPUExecutionProvider::default()
                .with_arena_allocator(cpu_mem_arena)
                .build()
                .error_on_failure(),
        }
    }
}

impl OnnxSession {
    pub fn new(runtime: Arc<Runtime>, model: impl AsRef<Path>) -> Result<Self> {
        runtime.commit_environment()?;
        let config = runtime.config();
        let executor = config.provider;

        let mut builder = Session::builder()?;
        if let Some(threads) = config.intra_threads {
            builder = builder.with_intra_threads(threads)?;
        }
        let session = builder
            .with_execution_providers([executor.dispatch(config.cpu_mem_arena)])?
            .commit_from_file(model.as_ref())?;

        debug!("Loaded {} on {:?}", model.as_ref().display(), executor);

        Ok(OnnxSession {
            session: Mutex::new(session),
            executor,
            model: model.as_ref().to_path_buf(),
            _runtime: runtime,
        })
    }

    pub fn executor(&self) -> ExecutionProvider {
        self.executor
    }

    pub fn model(&self) -> &Path {
        &self.model
    }
}

impl InferenceBackend for OnnxSession {
    fn run(&self, inputs: &[(&str, TensorInput<'_>)]) -> crate::Result<TensorOutputs> {
        let context = || format!("onnx session `{}` failed", self.model.display());

        let values = inputs
            .iter()
            .map(|(name, input)| {
                let value: SessionInputValue<'_> = match input {
                    TensorInput::Float(view) => TensorRef::from_array_view(view.clone())?.into(),
                    TensorInput::Int64(view) => TensorRef::from_array_view(view.clone())?.into(),
                };
                Ok((Cow::Borrowed(*name), value))
            })
            .collect::<ort::Result<Vec<_>>>()
            .map_err(|e| VisionError::backend(context(), e))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(values)
            .map_err(|e| VisionError::backend(context(), e))?;
        debug!("Finish running model");

        let mut tensors = TensorOutputs::new();
        for (name, value) in outputs {
            let tensor = value
                .try_extract_array::<f32>()
                .map_err(|e| VisionError::backend(format!("output `{name}` is not f32"), e))?
                .to_owned();
            tensors.insert(name, tensor);
        }

        Ok(tensors)
    }
}
