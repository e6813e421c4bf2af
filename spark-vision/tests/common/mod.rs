#![allow(dead_code)]

use ndarray::{ArrayD, IxDyn};
use parking_lot::Mutex;
use spark_vision::engine::{InferenceBackend, TensorInput, TensorOutputs};
use spark_vision::{Result, VisionError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn tensor(shape: &[usize], data: Vec<f32>) -> ArrayD<f32> {
    ArrayD::from_shape_vec(IxDyn(shape), data).expect("tensor data matches its shape")
}

/// Lays anchors out channel-major, `[1, channels, anchors]`.
pub fn dense_output(anchors: &[Vec<f32>]) -> ArrayD<f32> {
    let channels = anchors.first().map(Vec::len).unwrap_or(0);
    let mut data = vec![0.0; channels * anchors.len()];
    for (anchor, values) in anchors.iter().enumerate() {
        for (channel, value) in values.iter().enumerate() {
            data[channel * anchors.len() + anchor] = *value;
        }
    }
    tensor(&[1, channels, anchors.len()], data)
}

/// Stacks rows as `[1, rows, attributes]`.
pub fn row_output(rows: &[Vec<f32>]) -> ArrayD<f32> {
    let attributes = rows.first().map(Vec::len).unwrap_or(0);
    tensor(&[1, rows.len(), attributes], rows.concat())
}

#[derive(Clone, Debug)]
pub enum RecordedInput {
    Float(ArrayD<f32>),
    Int64(ArrayD<i64>),
}

impl RecordedInput {
    pub fn shape(&self) -> &[usize] {
        match self {
            RecordedInput::Float(array) => array.shape(),
            RecordedInput::Int64(array) => array.shape(),
        }
    }
}

/// Backend that answers every run with the same canned outputs and records what it was given.
pub struct ScriptedBackend {
    outputs: TensorOutputs,
    calls: AtomicUsize,
    last_inputs: Mutex<HashMap<String, RecordedInput>>,
}

impl ScriptedBackend {
    pub fn new<'a>(outputs: impl IntoIterator<Item = (&'a str, ArrayD<f32>)>) -> Self {
        Self {
            outputs: outputs.into_iter().collect(),
            calls: AtomicUsize::new(0),
            last_inputs: Mutex::new(HashMap::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn input(&self, name: &str) -> Option<RecordedInput> {
        self.last_inputs.lock().get(name).cloned()
    }
}

impl InferenceBackend for ScriptedBackend {
    fn run(&self, inputs: &[(&str, TensorInput<'_>)]) -> Result<TensorOutputs> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut recorded = self.last_inputs.lock();
        recorded.clear();
        for (name, input) in inputs {
            let input = match input {
                TensorInput::Float(view) => RecordedInput::Float(view.to_owned()),
                TensorInput::Int64(view) => RecordedInput::Int64(view.to_owned()),
            };
            recorded.insert(name.to_string(), input);
        }

        Ok(self.outputs.clone())
    }
}

/// Backend whose every run fails.
pub struct FailingBackend;

impl InferenceBackend for FailingBackend {
    fn run(&self, _inputs: &[(&str, TensorInput<'_>)]) -> Result<TensorOutputs> {
        Err(VisionError::backend(
            "scripted failure",
            std::io::Error::new(std::io::ErrorKind::Other, "device lost"),
        ))
    }
}
