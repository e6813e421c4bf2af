use crate::error::{Result, VisionError};
use ndarray::{ArrayD, ArrayViewD};
use std::collections::HashMap;
use std::sync::Arc;

pub mod inference_engine;
pub mod runtime;

/// Borrowed input tensor handed to a backend.
#[derive(Clone, Debug)]
pub enum TensorInput<'a> {
    Float(ArrayViewD<'a, f32>),
    Int64(ArrayViewD<'a, i64>),
}

impl TensorInput<'_> {
    pub fn shape(&self) -> &[usize] {
        match self {
            TensorInput::Float(view) => view.shape(),
            TensorInput::Int64(view) => view.shape(),
        }
    }
}

impl<'a> From<ArrayViewD<'a, f32>> for TensorInput<'a> {
    fn from(view: ArrayViewD<'a, f32>) -> Self {
        TensorInput::Float(view)
    }
}

impl<'a> From<ArrayViewD<'a, i64>> for TensorInput<'a> {
    fn from(view: ArrayViewD<'a, i64>) -> Self {
        TensorInput::Int64(view)
    }
}

/// Named `f32` outputs of one backend run.
#[derive(Clone, Debug, Default)]
pub struct TensorOutputs {
    tensors: HashMap<String, ArrayD<f32>>,
}

impl TensorOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, tensor: ArrayD<f32>) {
        self.tensors.insert(name.into(), tensor);
    }

    pub fn get(&self, name: &str) -> Result<&ArrayD<f32>> {
        self.tensors
            .get(name)
            .ok_or_else(|| VisionError::MissingOutput(name.to_string()))
    }

    pub fn remove(&mut self, name: &str) -> Result<ArrayD<f32>> {
        self.tensors
            .remove(name)
            .ok_or_else(|| VisionError::MissingOutput(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tensors.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tensors.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, ArrayD<f32>)> for TensorOutputs {
    fn from_iter<I: IntoIterator<Item = (S, ArrayD<f32>)>>(iter: I) -> Self {
        Self {
            tensors: iter.into_iter().map(|(name, tensor)| (name.into(), tensor)).collect(),
        }
    }
}

/// Runs a loaded model on named inputs.
///
/// Implementations must be callable from several threads at once; a backend
/// that cannot run concurrently serialises calls internally.
pub trait InferenceBackend: Send + Sync {
    fn run(&self, inputs: &[(&str, TensorInput<'_>)]) -> Result<TensorOutputs>;
}

impl<B: InferenceBackend + ?Sized> InferenceBackend for &B {
    fn run(&self, inputs: &[(&str, TensorInput<'_>)]) -> Result<TensorOutputs> {
        (**self).run(inputs)
    }
}

impl<B: InferenceBackend + ?Sized> InferenceBackend for Box<B> {
    fn run(&self, inputs: &[(&str, TensorInput<'_>)]) -> Result<TensorOutputs> {
        (**self).run(inputs)
    }
}

impl<B: InferenceBackend + ?Sized> InferenceBackend for Arc<B> {
    fn run(&self, inputs: &[(&str, TensorInput<'_>)]) -> Result<TensorOutputs> {
        (**self).run(inputs)
    }
}
