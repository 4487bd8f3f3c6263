//! Affine transform kernels
//!
//! `y = x · W + b` with `x: [batch, n_input]`, `W: [n_input, n_output]`, `b: [n_output]`.

use crate::error::{LayerError, Result};
use crate::functions::view_as;
use crate::Tensor;
use ndarray::{Axis, Ix1, Ix2};

/// Forward affine transform, broadcasting `b` over the batch.
pub fn linear(x: &Tensor, w: &Tensor, b: &Tensor) -> Result<Tensor> {
    let x = view_as::<Ix2>(x, "linear input", "[batch, n_input]")?;
    let w = view_as::<Ix2>(w, "linear weight", "[n_input, n_output]")?;
    let b = view_as::<Ix1>(b, "linear bias", "[n_output]")?;

    if x.ncols() != w.nrows() {
        return Err(LayerError::shape_mismatch(
            "linear input",
            [x.nrows(), w.nrows()],
            x.shape(),
        ));
    }
    if b.len() != w.ncols() {
        return Err(LayerError::shape_mismatch("linear bias", [w.ncols()], b.shape()));
    }

    let mut y = x.dot(&w);
    y += &b;
    Ok(y.into_dyn())
}

/// Input gradient of [`linear`]: `dy · Wᵗ`.
pub fn linear_grad(dy: &Tensor, w: &Tensor) -> Result<Tensor> {
    let dy = view_as::<Ix2>(dy, "linear gradient", "[batch, n_output]")?;
    let w = view_as::<Ix2>(w, "linear weight", "[n_input, n_output]")?;

    if dy.ncols() != w.ncols() {
        return Err(LayerError::shape_mismatch(
            "linear gradient",
            [dy.nrows(), w.ncols()],
            dy.shape(),
        ));
    }
    Ok(dy.dot(&w.t()).into_dyn())
}

/// Parameter gradients of [`linear`]: `(xᵗ · dy, Σ_batch dy)`.
pub fn linear_param_grads(x: &Tensor, dy: &Tensor) -> Result<(Tensor, Tensor)> {
    let x = view_as::<Ix2>(x, "linear input", "[batch, n_input]")?;
    let dy = view_as::<Ix2>(dy, "linear gradient", "[batch, n_output]")?;

    if x.nrows() != dy.nrows() {
        return Err(LayerError::shape_mismatch(
            "linear gradient",
            [x.nrows(), dy.ncols()],
            dy.shape(),
        ));
    }
    let dw = x.t().dot(&dy);
    let db = dy.sum_axis(Axis(0));
    Ok((dw.into_dyn(), db.into_dyn()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{arr1, arr2};

    #[test]
    fn test_linear_known_values() {
        let x = arr2(&[[1.0f32, 2.0], [3.0, 4.0]]).into_dyn();
        let w = arr2(&[[1.0f32, 0.0, 2.0], [0.0, 1.0, -1.0]]).into_dyn();
        let b = arr1(&[0.5f32, -0.5, 0.0]).into_dyn();

        let y = linear(&x, &w, &b).unwrap();

        assert_eq!(y.shape(), &[2, 3]);
        let expected = [1.5, 1.5, 0.0, 3.5, 3.5, 2.0];
        for (out, exp) in y.iter().zip(expected.iter()) {
            assert_relative_eq!(*out, *exp);
        }
    }

    #[test]
    fn test_linear_rejects_feature_mismatch() {
        let x = arr2(&[[1.0f32, 2.0, 3.0]]).into_dyn();
        let w = arr2(&[[1.0f32], [1.0]]).into_dyn();
        let b = arr1(&[0.0f32]).into_dyn();

        assert!(matches!(
            linear(&x, &w, &b),
            Err(LayerError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_linear_grad_transposes_weight() {
        let dy = arr2(&[[1.0f32, 1.0, 1.0]]).into_dyn();
        let w = arr2(&[[1.0f32, 2.0, 3.0], [4.0, 5.0, 6.0]]).into_dyn();

        let dx = linear_grad(&dy, &w).unwrap();

        assert_eq!(dx.shape(), &[1, 2]);
        assert_relative_eq!(dx[[0, 0]], 6.0);
        assert_relative_eq!(dx[[0, 1]], 15.0);
    }

    #[test]
    fn test_param_grads() {
        let x = arr2(&[[1.0f32, 2.0], [3.0, 4.0]]).into_dyn();
        let dy = arr2(&[[1.0f32], [-1.0]]).into_dyn();

        let (dw, db) = linear_param_grads(&x, &dy).unwrap();

        assert_eq!(dw.shape(), &[2, 1]);
        assert_relative_eq!(dw[[0, 0]], -2.0);
        assert_relative_eq!(dw[[1, 0]], -2.0);
        assert_eq!(db.shape(), &[1]);
        assert_relative_eq!(db[[0]], 0.0);
    }
}
