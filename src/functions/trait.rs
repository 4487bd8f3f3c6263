//! Function trait definition
//!
//! A Function is the minimal differentiable operation: it maps an input tensor to
//! an output tensor and maps an output gradient back to an input gradient.

use crate::error::Result;
use crate::Tensor;

/// Core trait for differentiable operations.
///
/// Functions without parameters (activations, reshapes) implement `forward`,
/// `backward` and `clear_cache`; trainable layers additionally override `update`
/// (see [`Layer`](crate::layers::Layer)).
///
/// # Pairing
///
/// Every `backward` call is paired with the oldest `forward` call that has not yet
/// been paired, so a caller may run `forward(x1)`, `forward(x2)`, `backward(dy1)`,
/// `backward(dy2)` and each gradient is matched to the input it belongs to.
///
/// # Example
///
/// ```ignore
/// let y = function.forward(&x)?;
/// let dx = function.backward(&dy)?;
/// function.update()?;
/// ```
pub trait Function {
    /// Forward propagation.
    ///
    /// Must not mutate `x`. The output shape depends only on the input shape and
    /// the function's hyperparameters.
    fn forward(&mut self, x: &Tensor) -> Result<Tensor>;

    /// Backward propagation.
    ///
    /// Given the gradient of a scalar objective with respect to the output of the
    /// paired `forward` call, returns the gradient with respect to its input.
    ///
    /// # Errors
    ///
    /// - `QueueUnderflow { queue: "forward" }` if no unpaired forward call exists
    /// - `ShapeMismatch` if `dy` does not match the paired forward output
    fn backward(&mut self, dy: &Tensor) -> Result<Tensor>;

    /// Apply one optimizer step. A no-op for functions without parameters.
    fn update(&mut self) -> Result<()> {
        Ok(())
    }

    /// Drop every cached activation.
    ///
    /// Used after inference passes, where forward is called without a matching
    /// backward and the caches would otherwise keep growing.
    fn clear_cache(&mut self);

    /// Short human-readable name used in diagnostics.
    fn name(&self) -> &'static str;
}
