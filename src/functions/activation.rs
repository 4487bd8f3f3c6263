//! Activation functions
//!
//! Elementwise nonlinearities implementing [`Function`]. Each keeps a FIFO of the
//! tensors its backward pass needs; `backward` consumes the oldest entry.

use crate::error::{LayerError, Result};
use crate::functions::Function;
use crate::Tensor;
use std::collections::VecDeque;

/// Sigmoid: 1 / (1 + exp(-x))
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Sigmoid derivative assuming y = sigmoid(x).
pub fn sigmoid_derivative(y: f32) -> f32 {
    y * (1.0 - y)
}

fn pop_paired(queue: &mut VecDeque<Tensor>, dy: &Tensor, context: &'static str) -> Result<Tensor> {
    let cached = queue
        .pop_front()
        .ok_or(LayerError::QueueUnderflow { queue: "forward" })?;
    if cached.shape() != dy.shape() {
        let err = LayerError::shape_mismatch(context, cached.shape(), dy.shape());
        queue.push_front(cached);
        return Err(err);
    }
    Ok(cached)
}

/// Rectified linear unit: max(0, x).
#[derive(Debug, Default)]
pub struct ReLU {
    inputs: VecDeque<Tensor>,
}

impl ReLU {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Function for ReLU {
    fn forward(&mut self, x: &Tensor) -> Result<Tensor> {
        self.inputs.push_back(x.clone());
        Ok(x.mapv(|v| v.max(0.0)))
    }

    fn backward(&mut self, dy: &Tensor) -> Result<Tensor> {
        let x = pop_paired(&mut self.inputs, dy, "relu gradient")?;
        let mut dx = dy.clone();
        dx.zip_mut_with(&x, |g, &v| {
            if v <= 0.0 {
                *g = 0.0;
            }
        });
        Ok(dx)
    }

    fn clear_cache(&mut self) {
        self.inputs.clear();
    }

    fn name(&self) -> &'static str {
        "relu"
    }
}

/// Logistic sigmoid. Caches its outputs, since σ'(x) = σ(x)(1 − σ(x)).
#[derive(Debug, Default)]
pub struct Sigmoid {
    outputs: VecDeque<Tensor>,
}

impl Sigmoid {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Function for Sigmoid {
    fn forward(&mut self, x: &Tensor) -> Result<Tensor> {
        let y = x.mapv(sigmoid);
        self.outputs.push_back(y.clone());
        Ok(y)
    }

    fn backward(&mut self, dy: &Tensor) -> Result<Tensor> {
        let y = pop_paired(&mut self.outputs, dy, "sigmoid gradient")?;
        let mut dx = dy.clone();
        dx.zip_mut_with(&y, |g, &s| *g *= sigmoid_derivative(s));
        Ok(dx)
    }

    fn clear_cache(&mut self) {
        self.outputs.clear();
    }

    fn name(&self) -> &'static str {
        "sigmoid"
    }
}
