//! 2D Convolutional layer implementation
//!
//! This module provides a Conv2D layer that performs 2D convolution over
//! `[batch, channels, height, width]` inputs, commonly used in computer vision
//! tasks like image classification.

use crate::error::{LayerError, Result};
use crate::functions::convolution::{convolution_2d, convolution_2d_grad, deconvolution_2d};
use crate::functions::{Conv2dParams, Function};
use crate::initializers::{fans, Initializer, LeCunNormal};
use crate::layers::{GradientQueue, Layer};
use crate::optimizers::Optimizer;
use crate::Tensor;
use tracing::{debug, trace};

/// 2D Convolutional layer with learnable filters and no bias.
///
/// Slides `out_channels` filters of size `kh × kw` over the input with the
/// configured stride and zero-padding.
///
/// The number of input channels is not a constructor argument. The filters
/// `[out_channels, in_channels, kh, kw]` are created on the first `forward`
/// call from the channel count of that input, and every later input must have
/// the same channel count.
///
/// # Example
///
/// ```
/// use neural_layers::functions::Function;
/// use neural_layers::layers::{Conv2D, Layer};
/// use neural_layers::optimizers::SGD;
/// use ndarray::Array4;
///
/// // 8 filters, 3x3 kernel, stride 1, padding 1
/// let mut layer = Conv2D::new(8, 3, 1, 1, &SGD::new(0.01)).unwrap();
/// assert!(!layer.is_initialized());
///
/// let x = Array4::<f32>::zeros((2, 1, 28, 28)).into_dyn();
/// let y = layer.forward(&x).unwrap();
/// assert_eq!(y.shape(), &[2, 8, 28, 28]);
/// assert_eq!(layer.weight().unwrap().shape(), &[8, 1, 3, 3]);
/// ```
pub struct Conv2D {
    out_channels: usize,
    params: Conv2dParams,
    weight: Option<Tensor>,
    initializer: Box<dyn Initializer>,
    rule: Box<dyn Optimizer>,
    queue: GradientQueue,
}

impl Conv2D {
    /// Square kernel with equal stride and padding on both axes.
    ///
    /// # Arguments
    ///
    /// * `out_channels` - Number of output feature maps (filters)
    /// * `kernel` - Size of square kernel (e.g., 3 for 3×3)
    /// * `stride` - Stride for convolution
    /// * `padding` - Zero-padding applied on every side
    /// * `optimizer` - Update rule for the filters
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if `out_channels`, `kernel` or `stride` is zero.
    pub fn new(
        out_channels: usize,
        kernel: usize,
        stride: usize,
        padding: usize,
        optimizer: &dyn Optimizer,
    ) -> Result<Self> {
        Self::with_params(out_channels, Conv2dParams::square(kernel, stride, padding)?, optimizer)
    }

    /// Full geometry: rectangular kernels, per-axis stride and padding, `cover_all`.
    pub fn with_params(
        out_channels: usize,
        params: Conv2dParams,
        optimizer: &dyn Optimizer,
    ) -> Result<Self> {
        if out_channels == 0 {
            return Err(LayerError::InvalidConfig(
                "out_channels must be greater than 0".to_string(),
            ));
        }
        // revalidate, the fields are public
        let params = Conv2dParams::new(
            params.kernel,
            params.stride,
            params.padding,
            params.cover_all,
        )?;

        Ok(Self {
            out_channels,
            params,
            weight: None,
            initializer: Box::new(LeCunNormal::new()),
            rule: optimizer.box_clone(),
            queue: GradientQueue::new(),
        })
    }

    /// Replace the filter initializer. Only has an effect before the first `forward`.
    pub fn with_initializer(mut self, initializer: impl Initializer + 'static) -> Self {
        self.initializer = Box::new(initializer);
        self
    }

    /// Keep trailing partial windows when the stride does not divide the padded input.
    pub fn with_cover_all(mut self, cover_all: bool) -> Self {
        self.params.cover_all = cover_all;
        self
    }

    pub fn out_channels(&self) -> usize {
        self.out_channels
    }

    pub fn params(&self) -> &Conv2dParams {
        &self.params
    }

    /// The filters, or `None` before the first `forward`.
    pub fn weight(&self) -> Option<&Tensor> {
        self.weight.as_ref()
    }

    fn weight_or_err(&self) -> Result<&Tensor> {
        self.weight.as_ref().ok_or(LayerError::Uninitialized("conv2d"))
    }
}

impl Function for Conv2D {
    fn forward(&mut self, x: &Tensor) -> Result<Tensor> {
        self.ensure_initialized(x.shape())?;
        let y = convolution_2d(x, self.weight_or_err()?, &self.params)?;
        self.queue.push_input(x.clone());
        Ok(y)
    }

    fn backward(&mut self, dy: &Tensor) -> Result<Tensor> {
        let (batch, height, width) = match self.queue.paired_input()?.shape() {
            &[n, _, h, w] => (n, h, w),
            other => {
                return Err(LayerError::shape_mismatch(
                    "conv2d input",
                    "[batch, channels, height, width]",
                    other,
                ))
            }
        };
        let (out_h, out_w) = self.params.output_size(height, width)?;
        if dy.shape() != [batch, self.out_channels, out_h, out_w] {
            return Err(LayerError::shape_mismatch(
                "conv2d gradient",
                [batch, self.out_channels, out_h, out_w],
                dy.shape(),
            ));
        }

        let dx = deconvolution_2d(dy, self.weight_or_err()?, &self.params, Some((height, width)))?;
        self.queue.push_gradient(dy.clone());
        Ok(dx)
    }

    fn update(&mut self) -> Result<()> {
        let weight = self
            .weight
            .as_mut()
            .ok_or(LayerError::QueueUnderflow { queue: "forward" })?;
        let (x, dy) = self.queue.pop_pair()?;
        let dw = convolution_2d_grad(&x, &dy, &self.params)?;

        self.rule.update(weight, &dw);

        trace!(
            layer = "conv2d",
            pending_inputs = self.queue.pending_inputs(),
            pending_gradients = self.queue.pending_gradients(),
            "applied parameter update"
        );
        Ok(())
    }

    fn clear_cache(&mut self) {
        self.queue.clear();
    }

    fn name(&self) -> &'static str {
        "conv2d"
    }
}

impl Layer for Conv2D {
    fn is_initialized(&self) -> bool {
        self.weight.is_some()
    }

    fn ensure_initialized(&mut self, input_shape: &[usize]) -> Result<()> {
        let &[_, channels, height, width] = input_shape else {
            return Err(LayerError::shape_mismatch(
                "conv2d input",
                "[batch, channels, height, width]",
                input_shape,
            ));
        };
        if channels == 0 {
            return Err(LayerError::InvalidConfig(
                "conv2d input must have at least one channel".to_string(),
            ));
        }
        self.params.output_size(height, width)?;

        if let Some(weight) = &self.weight {
            let expected = weight.shape()[1];
            if channels != expected {
                return Err(LayerError::ShapeMismatch {
                    context: "conv2d input",
                    expected: format!("[batch, {}, height, width]", expected),
                    got: format!("{:?}", input_shape),
                });
            }
            return Ok(());
        }

        let (kh, kw) = self.params.kernel;
        let shape = [self.out_channels, channels, kh, kw];
        let weight = self.initializer.initialize(&shape);
        if weight.shape() != shape {
            return Err(LayerError::shape_mismatch("conv2d initializer", shape, weight.shape()));
        }

        debug!(
            layer = "conv2d",
            shape = ?shape,
            fan_in = fans(&shape).0,
            "initialized filters"
        );
        self.weight = Some(weight);
        Ok(())
    }

    fn parameters(&self) -> Vec<&Tensor> {
        self.weight.iter().collect()
    }

    fn pending_inputs(&self) -> usize {
        self.queue.pending_inputs()
    }

    fn pending_gradients(&self) -> usize {
        self.queue.pending_gradients()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::initializers::Constant;
    use crate::optimizers::SGD;
    use ndarray::{Array4, IxDyn};

    fn ones(shape: &[usize]) -> Tensor {
        Tensor::ones(IxDyn(shape))
    }

    #[test]
    fn test_conv2d_rejects_invalid_geometry() {
        let sgd = SGD::new(0.1);
        assert!(matches!(Conv2D::new(0, 3, 1, 0, &sgd), Err(LayerError::InvalidConfig(_))));
        assert!(matches!(Conv2D::new(4, 0, 1, 0, &sgd), Err(LayerError::InvalidConfig(_))));
        assert!(matches!(Conv2D::new(4, 3, 0, 0, &sgd), Err(LayerError::InvalidConfig(_))));
    }

    #[test]
    fn test_lazy_initialization_from_input_channels() {
        let mut layer = Conv2D::new(4, 3, 1, 0, &SGD::new(0.1)).unwrap();
        assert!(!layer.is_initialized());
        assert!(layer.parameters().is_empty());
        assert_eq!(layer.parameter_count(), 0);

        layer.forward(&ones(&[1, 3, 5, 5])).unwrap();

        assert!(layer.is_initialized());
        assert_eq!(layer.weight().unwrap().shape(), &[4, 3, 3, 3]);
        assert_eq!(layer.parameter_count(), 4 * 3 * 3 * 3);
    }

    #[test]
    fn test_initialization_is_one_shot() {
        let mut layer = Conv2D::new(2, 3, 1, 1, &SGD::new(0.1)).unwrap();
        layer.forward(&ones(&[1, 1, 6, 6])).unwrap();
        let first = layer.weight().unwrap().clone();

        // different batch size and spatial size reuse the same filters
        layer.forward(&ones(&[4, 1, 8, 8])).unwrap();
        assert_eq!(layer.weight().unwrap(), &first);

        let err = layer.forward(&ones(&[1, 2, 6, 6])).unwrap_err();
        assert!(matches!(err, LayerError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_input_smaller_than_kernel() {
        let mut layer = Conv2D::new(2, 5, 1, 0, &SGD::new(0.1)).unwrap();
        let err = layer.forward(&ones(&[1, 1, 3, 3])).unwrap_err();

        assert!(matches!(err, LayerError::InvalidConfig(_)));
        assert!(!layer.is_initialized());
    }

    #[test]
    fn test_output_sizes() {
        let sgd = SGD::new(0.1);
        let x = ones(&[1, 1, 28, 28]);

        let mut same = Conv2D::new(1, 3, 1, 1, &sgd).unwrap();
        assert_eq!(same.forward(&x).unwrap().shape(), &[1, 1, 28, 28]);

        let mut strided = Conv2D::new(1, 4, 2, 0, &sgd).unwrap();
        assert_eq!(strided.forward(&x).unwrap().shape(), &[1, 1, 13, 13]);

        let mut covered = Conv2D::new(1, 3, 2, 0, &sgd).unwrap().with_cover_all(true);
        assert_eq!(covered.forward(&x).unwrap().shape(), &[1, 1, 14, 14]);
    }

    #[test]
    fn test_forward_backward_update_with_constant_filters() {
        let mut layer = Conv2D::new(1, 2, 1, 0, &SGD::new(0.1))
            .unwrap()
            .with_initializer(Constant(1.0));
        let x = Array4::from_shape_fn((1, 1, 3, 3), |(_, _, i, j)| (i * 3 + j) as f32).into_dyn();

        let y = layer.forward(&x).unwrap();
        // 2x2 window sums of [[0,1,2],[3,4,5],[6,7,8]]
        assert_eq!(y.iter().cloned().collect::<Vec<_>>(), vec![8.0, 12.0, 20.0, 24.0]);

        let dx = layer.backward(&ones(&[1, 1, 2, 2])).unwrap();
        assert_eq!(
            dx.iter().cloned().collect::<Vec<_>>(),
            vec![1.0, 2.0, 1.0, 2.0, 4.0, 2.0, 1.0, 2.0, 1.0]
        );

        layer.update().unwrap();
        // dW is the window sums of x under an all-ones gradient
        let w: Vec<f32> = layer.weight().unwrap().iter().cloned().collect();
        let expected = [1.0 - 0.8, 1.0 - 1.2, 1.0 - 2.0, 1.0 - 2.4];
        for (a, b) in w.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn test_backward_without_forward() {
        let mut layer = Conv2D::new(1, 3, 1, 1, &SGD::new(0.1)).unwrap();
        let err = layer.backward(&ones(&[1, 1, 4, 4])).unwrap_err();
        assert!(matches!(err, LayerError::QueueUnderflow { queue: "forward" }));

        let err = layer.update().unwrap_err();
        assert!(matches!(err, LayerError::QueueUnderflow { queue: "forward" }));
    }

    #[test]
    fn test_backward_gradient_shape_must_match() {
        let mut layer = Conv2D::new(2, 3, 1, 1, &SGD::new(0.1)).unwrap();
        layer.forward(&ones(&[1, 1, 4, 4])).unwrap();

        let err = layer.backward(&ones(&[1, 1, 4, 4])).unwrap_err();
        assert!(matches!(err, LayerError::ShapeMismatch { .. }));
        assert_eq!(layer.pending_gradients(), 0);
    }
}
