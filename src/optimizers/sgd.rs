//! Stochastic Gradient Descent (SGD) optimizer implementation
//!
//! This module provides a vanilla SGD optimizer that performs the basic
//! gradient descent update: `parameter = parameter - learning_rate * gradient`

use crate::optimizers::{assert_same_shape, Optimizer};
use crate::Tensor;

/// Stochastic Gradient Descent optimizer.
///
/// Implements the basic gradient descent update rule without momentum or
/// adaptive learning rates:
///
/// `w = w - η * ∇L/∂w`
///
/// where w is the parameter, η (eta) is the learning rate, and ∇L/∂w is the gradient.
///
/// # Example
///
/// ```
/// use neural_layers::optimizers::{Optimizer, SGD};
/// use ndarray::arr1;
///
/// let mut optimizer = SGD::new(0.01);
/// let mut weights = arr1(&[1.0f32, 2.0, 3.0]).into_dyn();
/// let gradients = arr1(&[0.1f32, 0.2, 0.3]).into_dyn();
///
/// optimizer.update(&mut weights, &gradients);
/// // weights are now: [0.999, 1.998, 2.997]
/// ```
#[derive(Debug, Clone)]
pub struct SGD {
    learning_rate: f32,
}

impl SGD {
    /// Creates a new SGD optimizer with the specified learning rate.
    ///
    /// # Typical Values
    ///
    /// - 0.01: Good starting point for many problems
    /// - 0.001: More conservative, useful for fine-tuning
    /// - 0.1: Aggressive, may cause instability
    pub fn new(learning_rate: f32) -> Self {
        Self { learning_rate }
    }

    /// Get the current learning rate.
    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }
}

impl Optimizer for SGD {
    /// Applies `parameter[i] -= learning_rate * gradient[i]`.
    ///
    /// # Panics
    ///
    /// Panics if `parameter` and `gradient` have different shapes.
    fn update(&mut self, parameter: &mut Tensor, gradient: &Tensor) {
        assert_same_shape(parameter, gradient);
        parameter.scaled_add(-self.learning_rate, gradient);
    }

    fn box_clone(&self) -> Box<dyn Optimizer> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    fn t(values: &[f32]) -> Tensor {
        arr1(values).into_dyn()
    }

    #[test]
    fn test_sgd_new() {
        let optimizer = SGD::new(0.01);
        assert_eq!(optimizer.learning_rate(), 0.01);
    }

    #[test]
    fn test_sgd_update() {
        let mut optimizer = SGD::new(0.1);
        let mut params = t(&[1.0, 2.0, 3.0]);
        let grads = t(&[0.1, 0.2, 0.3]);

        optimizer.update(&mut params, &grads);

        assert!((params[[0]] - 0.99).abs() < 1e-6);
        assert!((params[[1]] - 1.98).abs() < 1e-6);
        assert!((params[[2]] - 2.97).abs() < 1e-6);
    }

    #[test]
    fn test_sgd_multiple_updates() {
        let mut optimizer = SGD::new(0.01);
        let mut params = t(&[1.0, 1.0]);
        let grads = t(&[1.0, -1.0]);

        optimizer.update(&mut params, &grads);
        assert!((params[[0]] - 0.99).abs() < 1e-6);
        assert!((params[[1]] - 1.01).abs() < 1e-6);

        optimizer.update(&mut params, &grads);
        assert!((params[[0]] - 0.98).abs() < 1e-6);
        assert!((params[[1]] - 1.02).abs() < 1e-6);
    }

    #[test]
    #[should_panic(expected = "Parameters and gradients must have the same shape")]
    fn test_sgd_mismatched_shapes() {
        let mut optimizer = SGD::new(0.01);
        let mut params = t(&[1.0, 2.0]);
        let grads = t(&[0.1, 0.2, 0.3]);
        optimizer.update(&mut params, &grads);
    }

    #[test]
    fn test_sgd_zero_learning_rate() {
        let mut optimizer = SGD::new(0.0);
        let mut params = t(&[1.0, 2.0, 3.0]);
        let original = params.clone();

        optimizer.update(&mut params, &t(&[0.1, 0.2, 0.3]));

        assert_eq!(params, original);
    }

    #[test]
    fn test_sgd_matrix_parameter() {
        let mut optimizer = SGD::new(1.0);
        let mut params = ndarray::arr2(&[[1.0f32, 2.0], [3.0, 4.0]]).into_dyn();
        let grads = ndarray::arr2(&[[1.0f32, 1.0], [1.0, 1.0]]).into_dyn();

        optimizer.update(&mut params, &grads);

        assert_eq!(params.as_slice().unwrap(), &[0.0, 1.0, 2.0, 3.0]);
    }
}
