//! Linear (fully connected) layer implementation
//!
//! This module provides a Linear layer that performs the transformation:
//! output = input × weight + bias

use crate::error::{LayerError, Result};
use crate::functions::linear::{linear, linear_grad, linear_param_grads};
use crate::functions::Function;
use crate::initializers::{Initializer, LeCunNormal};
use crate::layers::{GradientQueue, Layer};
use crate::optimizers::Optimizer;
use crate::Tensor;
use ndarray::IxDyn;
use tracing::trace;

/// Linear layer with a weight matrix and a bias vector.
///
/// Performs y = xW + b
/// where x is the input (batch_size × n_input),
/// W is the weight matrix (n_input × n_output),
/// and b is the bias vector (n_output).
///
/// Parameters exist from construction: `W` is drawn from the initializer
/// (LeCun normal by default) and `b` starts at zero.
///
/// # Example
///
/// ```
/// use neural_layers::layers::{Layer, Linear};
/// use neural_layers::optimizers::SGD;
///
/// let layer = Linear::new(784, 512, &SGD::new(0.01)).unwrap();
/// assert_eq!(layer.n_input(), 784);
/// assert_eq!(layer.n_output(), 512);
/// assert_eq!(layer.parameter_count(), 784 * 512 + 512);
/// ```
pub struct Linear {
    n_input: usize,
    n_output: usize,
    weight: Tensor,
    bias: Tensor,
    weight_rule: Box<dyn Optimizer>,
    bias_rule: Box<dyn Optimizer>,
    queue: GradientQueue,
}

impl Linear {
    /// Create a Linear layer with LeCun-normal weights and zero bias.
    ///
    /// The weight and the bias each get their own clone of `optimizer`.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if either size is zero.
    pub fn new(n_input: usize, n_output: usize, optimizer: &dyn Optimizer) -> Result<Self> {
        Self::with_initializer(n_input, n_output, optimizer, &mut LeCunNormal::new())
    }

    /// Create a Linear layer whose weight is drawn from `initializer`.
    pub fn with_initializer(
        n_input: usize,
        n_output: usize,
        optimizer: &dyn Optimizer,
        initializer: &mut dyn Initializer,
    ) -> Result<Self> {
        if n_input == 0 || n_output == 0 {
            return Err(LayerError::InvalidConfig(format!(
                "linear layer sizes must be greater than 0, got {} -> {}",
                n_input, n_output
            )));
        }

        let weight = initializer.initialize(&[n_input, n_output]);
        if weight.shape() != [n_input, n_output] {
            return Err(LayerError::shape_mismatch(
                "linear initializer",
                [n_input, n_output],
                weight.shape(),
            ));
        }

        Ok(Self {
            n_input,
            n_output,
            weight,
            bias: Tensor::zeros(IxDyn(&[n_output])),
            weight_rule: optimizer.box_clone(),
            bias_rule: optimizer.box_clone(),
            queue: GradientQueue::new(),
        })
    }

    pub fn n_input(&self) -> usize {
        self.n_input
    }

    pub fn n_output(&self) -> usize {
        self.n_output
    }

    pub fn weight(&self) -> &Tensor {
        &self.weight
    }

    pub fn bias(&self) -> &Tensor {
        &self.bias
    }
}

impl Function for Linear {
    fn forward(&mut self, x: &Tensor) -> Result<Tensor> {
        self.ensure_initialized(x.shape())?;
        let y = linear(x, &self.weight, &self.bias)?;
        self.queue.push_input(x.clone());
        Ok(y)
    }

    fn backward(&mut self, dy: &Tensor) -> Result<Tensor> {
        let batch = self.queue.paired_input()?.shape()[0];
        if dy.shape() != [batch, self.n_output] {
            return Err(LayerError::shape_mismatch(
                "linear gradient",
                [batch, self.n_output],
                dy.shape(),
            ));
        }

        let dx = linear_grad(dy, &self.weight)?;
        self.queue.push_gradient(dy.clone());
        Ok(dx)
    }

    fn update(&mut self) -> Result<()> {
        let (x, dy) = self.queue.pop_pair()?;
        let (dw, db) = linear_param_grads(&x, &dy)?;

        self.weight_rule.update(&mut self.weight, &dw);
        self.bias_rule.update(&mut self.bias, &db);

        trace!(
            layer = "linear",
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
        "linear"
    }
}

impl Layer for Linear {
    fn is_initialized(&self) -> bool {
        true
    }

    fn ensure_initialized(&mut self, input_shape: &[usize]) -> Result<()> {
        match input_shape {
            [_, n] if *n == self.n_input => Ok(()),
            _ => Err(LayerError::ShapeMismatch {
                context: "linear input",
                expected: format!("[batch, {}]", self.n_input),
                got: format!("{:?}", input_shape),
            }),
        }
    }

    fn parameters(&self) -> Vec<&Tensor> {
        vec![&self.weight, &self.bias]
    }

    fn pending_inputs(&self) -> usize {
        self.queue.pending_inputs()
    }

    fn pending_gradients(&self) -> usize {
        self.queue.pending_gradients()
    }
}
