//! Neural network building blocks
//!
//! This library provides differentiable functions and trainable layers that share
//! one execution protocol: `forward` caches its input, `backward` caches the
//! upstream gradient, and a later `update` pairs the oldest cached input with the
//! oldest cached gradient to compute parameter gradients and hand them to an
//! optimizer. Several forward/backward pairs may be queued before each update.
//!
//! # Modules
//!
//! - `functions`: Function trait, pure convolution/linear kernels, activations, loss
//! - `layers`: Layer trait and implementations (Linear, Conv2D)
//! - `initializers`: Parameter initializers (LeCun normal, He normal, Glorot uniform)
//! - `optimizers`: Optimizer trait and implementations (SGD, Momentum, Adam)
//! - `network`: Sequential composition of functions and layers
//! - `datasets`: MNIST IDX reader and in-memory dataset batching
//! - `config`: Training configuration structures
//! - `architecture`: Architecture configuration and network building
//! - `training`: Epoch training and evaluation helpers
//! - `utils`: Numerical gradient checking

pub mod architecture;
pub mod config;
pub mod datasets;
pub mod error;
pub mod functions;
pub mod initializers;
pub mod layers;
pub mod network;
pub mod optimizers;
pub mod training;
pub mod utils;

/// N-dimensional `f32` array used for inputs, outputs, parameters and gradients.
pub type Tensor = ndarray::ArrayD<f32>;

pub use error::{DatasetError, LayerError};
