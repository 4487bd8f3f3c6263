//! Adam (Adaptive Moment Estimation) optimizer implementation
//!
//! This module provides the Adam optimizer, which combines momentum and
//! adaptive learning rates with bias correction for improved convergence.

use crate::optimizers::{assert_same_shape, Optimizer};
use crate::Tensor;
use ndarray::Zip;

/// Adam (Adaptive Moment Estimation) optimizer.
///
/// Maintains two moving averages for the parameter it is attached to:
///
/// 1. First moment (mean) of gradients (momentum)
/// 2. Second moment (uncentered variance) of gradients (adaptive learning rate)
///
/// The update rule is:
///
/// ```text
/// m_t = β1 * m_{t-1} + (1 - β1) * gradient
/// v_t = β2 * v_{t-1} + (1 - β2) * gradient²
/// m_hat = m_t / (1 - β1^t)
/// v_hat = v_t / (1 - β2^t)
/// parameter = parameter - α * m_hat / (√v_hat + ε)
/// ```
///
/// # Fields
///
/// * `learning_rate` - The step size for parameter updates (α)
/// * `beta1` - Exponential decay rate for first moment estimates (typically 0.9)
/// * `beta2` - Exponential decay rate for second moment estimates (typically 0.999)
/// * `epsilon` - Small constant for numerical stability (typically 1e-8)
/// * `m` - First moment estimates, allocated on first update
/// * `v` - Second moment estimates, allocated on first update
/// * `t` - Time step counter for bias correction
///
/// # Reference
///
/// Kingma, D. P., & Ba, J. (2014). Adam: A method for stochastic optimization.
/// arXiv preprint arXiv:1412.6980.
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    m: Option<Tensor>,
    v: Option<Tensor>,
    t: usize,
}

impl Adam {
    /// Creates a new Adam optimizer with the specified hyperparameters.
    ///
    /// # Examples
    ///
    /// ```
    /// use neural_layers::optimizers::Adam;
    ///
    /// // Default Adam hyperparameters from the paper
    /// let optimizer = Adam::new(0.001, 0.9, 0.999, 1e-8);
    /// assert_eq!(optimizer.learning_rate(), 0.001);
    /// ```
    pub fn new(learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            m: None,
            v: None,
            t: 0,
        }
    }

    /// Adam with the paper's recommended β1, β2 and ε.
    pub fn with_learning_rate(learning_rate: f32) -> Self {
        Self::new(learning_rate, 0.9, 0.999, 1e-8)
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }
}

impl Optimizer for Adam {
    /// # Panics
    ///
    /// Panics if `parameter` and `gradient` have different shapes.
    fn update(&mut self, parameter: &mut Tensor, gradient: &Tensor) {
        assert_same_shape(parameter, gradient);

        // Moment estimates follow the parameter's shape
        if self.m.as_ref().map_or(true, |m| m.shape() != parameter.shape()) {
            self.m = Some(Tensor::zeros(parameter.raw_dim()));
            self.v = Some(Tensor::zeros(parameter.raw_dim()));
        }
        let (Some(m), Some(v)) = (self.m.as_mut(), self.v.as_mut()) else {
            return;
        };

        self.t += 1;
        let bias_correction1 = 1.0 - self.beta1.powi(self.t as i32);
        let bias_correction2 = 1.0 - self.beta2.powi(self.t as i32);
        let (beta1, beta2) = (self.beta1, self.beta2);
        let (lr, eps) = (self.learning_rate, self.epsilon);

        Zip::from(parameter)
            .and(m)
            .and(v)
            .and(gradient)
            .for_each(|p, m, v, &g| {
                *m = beta1 * *m + (1.0 - beta1) * g;
                *v = beta2 * *v + (1.0 - beta2) * g * g;
                let m_hat = *m / bias_correction1;
                let v_hat = *v / bias_correction2;
                *p -= lr * m_hat / (v_hat.sqrt() + eps);
            });
    }

    /// Clears both moment estimates and the time step counter.
    fn reset(&mut self) {
        self.m = None;
        self.v = None;
        self.t = 0;
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
    fn test_adam_new() {
        let optimizer = Adam::new(0.001, 0.9, 0.999, 1e-8);
        assert_eq!(optimizer.learning_rate(), 0.001);
        assert_eq!(optimizer.beta1, 0.9);
        assert_eq!(optimizer.beta2, 0.999);
        assert_eq!(optimizer.epsilon, 1e-8);
        assert_eq!(optimizer.t, 0);
    }

    #[test]
    fn test_adam_update_moves_against_gradient() {
        let mut optimizer = Adam::new(0.001, 0.9, 0.999, 1e-8);
        let mut params = t(&[1.0, 2.0, 3.0]);
        let original = params.clone();

        optimizer.update(&mut params, &t(&[0.1, 0.2, 0.3]));

        for (p, o) in params.iter().zip(original.iter()) {
            assert!(p < o);
        }
    }

    #[test]
    fn test_adam_first_step_is_learning_rate() {
        // With bias correction the first step is lr * g / |g| (up to epsilon)
        let mut optimizer = Adam::new(0.01, 0.9, 0.999, 1e-8);
        let mut params = t(&[1.0, 1.0]);

        optimizer.update(&mut params, &t(&[5.0, -0.2]));

        assert!((params[[0]] - 0.99).abs() < 1e-5);
        assert!((params[[1]] - 1.01).abs() < 1e-5);
    }

    #[test]
    fn test_adam_reset() {
        let mut optimizer = Adam::new(0.001, 0.9, 0.999, 1e-8);
        let mut params = t(&[1.0, 2.0, 3.0]);
        let grads = t(&[0.1, 0.2, 0.3]);

        optimizer.update(&mut params, &grads);
        optimizer.update(&mut params, &grads);
        assert_eq!(optimizer.t, 2);
        assert!(optimizer.m.is_some());

        optimizer.reset();

        assert_eq!(optimizer.t, 0);
        assert!(optimizer.m.is_none());
        assert!(optimizer.v.is_none());
    }

    #[test]
    #[should_panic(expected = "Parameters and gradients must have the same shape")]
    fn test_adam_mismatched_shapes() {
        let mut optimizer = Adam::new(0.001, 0.9, 0.999, 1e-8);
        let mut params = t(&[1.0, 2.0, 3.0]);
        optimizer.update(&mut params, &t(&[0.1, 0.2]));
    }

    #[test]
    fn test_adam_state_persistence() {
        let mut optimizer = Adam::with_learning_rate(0.01);
        let mut params = t(&[1.0, 2.0]);

        optimizer.update(&mut params, &t(&[0.1, 0.2]));
        let m_after_first = optimizer.m.clone();

        optimizer.update(&mut params, &t(&[0.1, 0.2]));
        assert_eq!(optimizer.t, 2);
        assert_ne!(optimizer.m, m_after_first);
    }
}
