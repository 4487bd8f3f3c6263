//! Error types for layers, functions and dataset loading
//!
//! Layer errors cover the three ways the forward/backward/update protocol can
//! be misused: bad hyperparameters, tensors of the wrong shape, and calls made
//! out of order (an `update()` or `backward()` with nothing queued to pair it with).

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by [`Function`](crate::functions::Function) and
/// [`Layer`](crate::layers::Layer) implementations.
#[derive(Debug, Error)]
pub enum LayerError {
    /// A queue that must hold at least one entry was empty.
    ///
    /// `queue` is `"forward"` when no cached input is available and
    /// `"backward"` when no cached upstream gradient is available.
    #[error("{queue} queue is empty; every update() needs a prior forward() and backward()")]
    QueueUnderflow { queue: &'static str },

    /// A tensor did not have the shape the operation requires.
    #[error("shape mismatch in {context}: expected {expected}, got {got}")]
    ShapeMismatch {
        context: &'static str,
        expected: String,
        got: String,
    },

    /// A hyperparameter or input geometry is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Parameters were requested before lazy initialization ran.
    #[error("{0} parameters are not initialized; call forward() first")]
    Uninitialized(&'static str),

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}

impl LayerError {
    pub(crate) fn shape_mismatch(
        context: &'static str,
        expected: impl std::fmt::Debug,
        got: impl std::fmt::Debug,
    ) -> Self {
        LayerError::ShapeMismatch {
            context,
            expected: format!("{:?}", expected),
            got: format!("{:?}", got),
        }
    }
}

/// Result alias used throughout the layer and function modules.
pub type Result<T> = std::result::Result<T, LayerError>;

/// Errors raised while reading IDX image/label files.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The magic number matched neither byte order.
    #[error("unrecognized magic number {found:#010x} in {path} (expected {expected})")]
    BadMagic {
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    /// The file ended before the header or payload was complete.
    #[error("{path} is truncated: need {expected} bytes, found {actual}")]
    Truncated {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },

    /// Image and label files disagree on the number of samples.
    #[error("dataset has {images} images but {labels} labels")]
    LengthMismatch { images: usize, labels: usize },

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}
