//! Differentiable functions
//!
//! This module provides the Function trait, the pure convolution and linear
//! kernels that layers are built on, and the parameter-free functions
//! (activations, flatten) that sit between layers.

mod r#trait;
pub mod activation;
pub mod convolution;
pub mod linear;
pub mod loss;
pub mod reshape;

pub use activation::{ReLU, Sigmoid};
pub use convolution::Conv2dParams;
pub use r#trait::Function;
pub use reshape::Flatten;

use crate::error::{LayerError, Result};
use crate::Tensor;
use ndarray::{ArrayView, Dimension, IxDyn};

/// View a dynamic tensor with a fixed rank, reporting `layout` on failure.
pub(crate) fn view_as<'a, D: Dimension>(
    tensor: &'a Tensor,
    context: &'static str,
    layout: &'static str,
) -> Result<ArrayView<'a, f32, D>> {
    tensor
        .view()
        .into_dimensionality::<D>()
        .map_err(|_| LayerError::ShapeMismatch {
            context,
            expected: layout.to_string(),
            got: format!("{:?}", tensor.shape()),
        })
}

/// Copy `tensor` into a new row-major tensor of `shape`.
///
/// Elements are taken in logical order, so the result does not depend on the
/// memory layout of the source.
pub(crate) fn reshape_owned(tensor: &Tensor, shape: &[usize]) -> Result<Tensor> {
    Ok(Tensor::from_shape_vec(
        IxDyn(shape),
        tensor.iter().cloned().collect(),
    )?)
}
