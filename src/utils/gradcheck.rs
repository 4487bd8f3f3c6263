//! Finite-difference gradient checking
//!
//! Compares analytical gradients against central differences of a scalar
//! objective. With `f32` arithmetic, a step around `1e-2` balances truncation
//! and rounding error for the functions in this crate.

use crate::Tensor;

/// Central-difference estimate of `∂f/∂x` at `x`.
///
/// Each element is perturbed by `±eps` in turn:
/// `(f(x + eps·e_i) - f(x - eps·e_i)) / (2·eps)`.
///
/// # Example
///
/// ```
/// use neural_layers::utils::numerical_gradient;
/// use ndarray::arr1;
///
/// let x = arr1(&[1.0f32, -2.0]).into_dyn();
/// // f(x) = Σ x², ∂f/∂x = 2x
/// let grad = numerical_gradient(&x, 1e-2, |t| t.mapv(|v| v * v).sum());
/// assert!((grad[[0]] - 2.0).abs() < 1e-3);
/// assert!((grad[[1]] + 4.0).abs() < 1e-3);
/// ```
pub fn numerical_gradient<F>(x: &Tensor, eps: f32, mut f: F) -> Tensor
where
    F: FnMut(&Tensor) -> f32,
{
    let mut probe = x.clone();
    let mut grad = Tensor::zeros(x.raw_dim());

    for (index, g) in grad.indexed_iter_mut() {
        let original = probe[&index];

        probe[&index] = original + eps;
        let plus = f(&probe);
        probe[&index] = original - eps;
        let minus = f(&probe);
        probe[&index] = original;

        *g = (plus - minus) / (2.0 * eps);
    }
    grad
}

/// Largest elementwise relative error between two gradients,
/// `|a - b| / max(1, |a| + |b|)`.
///
/// Returns `f32::INFINITY` if the shapes differ.
pub fn relative_error(analytic: &Tensor, numeric: &Tensor) -> f32 {
    if analytic.shape() != numeric.shape() {
        return f32::INFINITY;
    }
    analytic
        .iter()
        .zip(numeric.iter())
        .map(|(&a, &b)| (a - b).abs() / (a.abs() + b.abs()).max(1.0))
        .fold(0.0, f32::max)
}
