use thiserror::Error;

pub type Result<T> = std::result::Result<T, VisionError>;

/// Broad classification of a [`VisionError`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The configuration disagrees with itself or with the model outputs.
    Configuration,
    /// The inference backend failed or returned something unusable.
    Backend,
    /// An operation was attempted on a resource in the wrong state.
    State,
    /// The input image cannot be processed.
    Input,
}

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("output `{name}` carries {actual} attributes, configuration expects {expected}")]
    ChannelMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("output `{name}` has shape {actual:?}, expected {expected}")]
    ShapeMismatch {
        name: String,
        expected: String,
        actual: Vec<usize>,
    },

    #[error("backend returned no output named `{0}`")]
    MissingOutput(String),

    #[error("{context}")]
    Backend {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("image embedding context has already been released")]
    ContextReleased,

    #[error("cannot process an empty image ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error(transparent)]
    Array(#[from] ndarray::ShapeError),
}

impl VisionError {
    pub fn backend(
        context: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        VisionError::Backend {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn shape_mismatch(name: &str, expected: impl Into<String>, actual: &[usize]) -> Self {
        VisionError::ShapeMismatch {
            name: name.to_string(),
            expected: expected.into(),
            actual: actual.to_vec(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            VisionError::InvalidConfig(_) | VisionError::ChannelMismatch { .. } => {
                ErrorKind::Configuration
            }
            VisionError::ShapeMismatch { .. }
            | VisionError::MissingOutput(_)
            | VisionError::Backend { .. }
            | VisionError::Array(_) => ErrorKind::Backend,
            VisionError::ContextReleased => ErrorKind::State,
            VisionError::EmptyImage { .. } => ErrorKind::Input,
        }
    }
}
