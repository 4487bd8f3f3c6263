//! Optimizer abstractions for neural network parameter updates
//!
//! This module provides the Optimizer trait and implementations for different
//! optimization algorithms used to update layer parameters during training.
//!
//! # Overview
//!
//! An optimizer receives one parameter tensor and its gradient and mutates the
//! parameter in place. Layers own their optimizers: a layer constructed with an
//! optimizer keeps one independent clone per parameter (via [`Optimizer::box_clone`]),
//! so stateful rules such as momentum or Adam track separate statistics for the
//! weight and the bias.
//!
//! # Available Optimizers
//!
//! - SGD: Vanilla stochastic gradient descent
//! - Momentum: SGD with a velocity term
//! - Adam: Adaptive moment estimation with bias correction
//! - Any `FnMut(&mut Tensor, &Tensor) + Clone` closure
//!
//! # Example
//!
//! ```
//! use neural_layers::optimizers::{Optimizer, SGD};
//! use ndarray::arr1;
//!
//! let mut optimizer = SGD::new(0.1);
//! let mut weights = arr1(&[1.0f32, 2.0]).into_dyn();
//! let gradients = arr1(&[1.0f32, -1.0]).into_dyn();
//!
//! optimizer.update(&mut weights, &gradients);
//! assert!((weights[[0]] - 0.9).abs() < 1e-6);
//! ```

pub mod adam;
pub mod momentum;
pub mod sgd;

pub use adam::Adam;
pub use momentum::Momentum;
pub use sgd::SGD;

use crate::Tensor;

/// Core trait for optimizers.
///
/// # State Management
///
/// Some optimizers (Momentum, Adam) keep state between updates. That state is
/// tied to a single parameter, which is why layers clone the optimizer they
/// are given once per parameter instead of sharing one instance.
pub trait Optimizer {
    /// Apply one update step to `parameter` in place.
    ///
    /// # Panics
    ///
    /// Implementations may panic if `parameter` and `gradient` have different shapes.
    fn update(&mut self, parameter: &mut Tensor, gradient: &Tensor);

    /// Clear accumulated state. A no-op for stateless optimizers.
    fn reset(&mut self) {}

    /// Clone into a fresh boxed optimizer with the same hyperparameters and state.
    fn box_clone(&self) -> Box<dyn Optimizer>;
}

impl<F> Optimizer for F
where
    F: FnMut(&mut Tensor, &Tensor) + Clone + 'static,
{
    fn update(&mut self, parameter: &mut Tensor, gradient: &Tensor) {
        self(parameter, gradient)
    }

    fn box_clone(&self) -> Box<dyn Optimizer> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn Optimizer> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

pub(crate) fn assert_same_shape(parameter: &Tensor, gradient: &Tensor) {
    assert_eq!(
        parameter.shape(),
        gradient.shape(),
        "Parameters and gradients must have the same shape"
    );
}
