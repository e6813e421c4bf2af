pub mod config;
pub mod engine;
pub mod error;
pub mod inference;
pub mod utils;

pub use error::{ErrorKind, Result, VisionError};
