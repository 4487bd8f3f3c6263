//! Layer trait definition for neural network layers
//!
//! This module defines the Layer trait that trainable layers implement on top of
//! [`Function`]. The trait adds lazy parameter initialization and introspection
//! over the queued inputs and gradients that `update` consumes.

use crate::error::Result;
use crate::functions::Function;
use crate::Tensor;

/// Core trait for trainable neural network layers.
///
/// A layer owns its parameters and the optimizer rule that updates them.
/// Training a layer is a three-step protocol:
///
/// 1. `forward(x)` computes the output and queues `x`
/// 2. `backward(dy)` computes the input gradient with the current parameters and queues `dy`
/// 3. `update()` pops the oldest `(x, dy)` pair, derives the parameter gradients
///    and hands each one to the optimizer
///
/// Several forward/backward rounds may run before the matching updates.
///
/// # Example
///
/// ```
/// use neural_layers::functions::Function;
/// use neural_layers::layers::{Layer, Linear};
/// use neural_layers::optimizers::SGD;
/// use ndarray::Array2;
///
/// let mut layer = Linear::new(4, 2, &SGD::new(0.1)).unwrap();
/// let x = Array2::<f32>::ones((3, 4)).into_dyn();
///
/// let y = layer.forward(&x).unwrap();
/// assert_eq!(y.shape(), &[3, 2]);
///
/// let dx = layer.backward(&y).unwrap();
/// assert_eq!(dx.shape(), &[3, 4]);
///
/// layer.update().unwrap();
/// assert_eq!(layer.pending_inputs(), 0);
/// ```
pub trait Layer: Function {
    /// Whether the parameters have been materialized.
    fn is_initialized(&self) -> bool;

    /// Materialize the parameters for an input of `input_shape` if that has not
    /// happened yet.
    ///
    /// Initialization happens once. Later calls only check that `input_shape`
    /// is compatible with the existing parameters; a different batch size is
    /// always compatible.
    ///
    /// # Errors
    ///
    /// - `ShapeMismatch` if `input_shape` does not fit the layer
    /// - `InvalidConfig` if the input is too small for the layer's geometry
    fn ensure_initialized(&mut self, input_shape: &[usize]) -> Result<()>;

    /// Trainable parameters in a fixed order (weight first). Empty before
    /// initialization.
    fn parameters(&self) -> Vec<&Tensor>;

    /// Total number of trainable scalars.
    fn parameter_count(&self) -> usize {
        self.parameters().iter().map(|p| p.len()).sum()
    }

    /// Inputs queued by `forward` and not yet consumed by `update`.
    fn pending_inputs(&self) -> usize;

    /// Gradients queued by `backward` and not yet consumed by `update`.
    fn pending_gradients(&self) -> usize;
}
