//! Flatten: `[batch, d1, d2, ...] -> [batch, d1 * d2 * ...]`
//!
//! Bridges convolution outputs into linear layers.

use crate::error::{LayerError, Result};
use crate::functions::{reshape_owned, Function};
use crate::Tensor;
use std::collections::VecDeque;

/// Collapses every axis after the batch axis into one.
#[derive(Debug, Default)]
pub struct Flatten {
    input_shapes: VecDeque<Vec<usize>>,
}

impl Flatten {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Function for Flatten {
    fn forward(&mut self, x: &Tensor) -> Result<Tensor> {
        let shape = x.shape();
        let Some((&batch, features)) = shape.split_first() else {
            return Err(LayerError::shape_mismatch(
                "flatten input",
                "[batch, ...]",
                shape,
            ));
        };
        let y = reshape_owned(x, &[batch, features.iter().product()])?;
        self.input_shapes.push_back(shape.to_vec());
        Ok(y)
    }

    fn backward(&mut self, dy: &Tensor) -> Result<Tensor> {
        let shape = self
            .input_shapes
            .front()
            .ok_or(LayerError::QueueUnderflow { queue: "forward" })?;
        let flat = [shape[0], shape[1..].iter().product()];
        if dy.shape() != &flat[..] {
            return Err(LayerError::shape_mismatch("flatten gradient", flat, dy.shape()));
        }
        let dx = reshape_owned(dy, shape)?;
        self.input_shapes.pop_front();
        Ok(dx)
    }

    fn clear_cache(&mut self) {
        self.input_shapes.clear();
    }

    fn name(&self) -> &'static str {
        "flatten"
    }
}
