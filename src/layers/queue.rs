//! FIFO bookkeeping shared by trainable layers
//!
//! A layer records every input it sees in `forward` and every upstream gradient
//! it sees in `backward`. `update` consumes the two oldest entries together, so
//! forward and backward calls for several batches may be issued before any
//! update and each gradient is still applied against the input it belongs to.

use crate::error::{LayerError, Result};
use crate::Tensor;
use std::collections::VecDeque;

#[derive(Debug, Clone, Default)]
pub struct GradientQueue {
    inputs: VecDeque<Tensor>,
    gradients: VecDeque<Tensor>,
}

impl GradientQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_input(&mut self, x: Tensor) {
        self.inputs.push_back(x);
    }

    /// The input the next `backward` call pairs with: the oldest input that has
    /// no gradient queued against it yet.
    pub fn paired_input(&self) -> Result<&Tensor> {
        self.inputs
            .get(self.gradients.len())
            .ok_or(LayerError::QueueUnderflow { queue: "forward" })
    }

    pub fn push_gradient(&mut self, dy: Tensor) {
        self.gradients.push_back(dy);
    }

    /// Remove and return the oldest `(input, gradient)` pair.
    ///
    /// Both queues are checked before anything is removed, so an underflow
    /// leaves the queue unchanged.
    pub fn pop_pair(&mut self) -> Result<(Tensor, Tensor)> {
        if self.inputs.is_empty() {
            return Err(LayerError::QueueUnderflow { queue: "forward" });
        }
        if self.gradients.is_empty() {
            return Err(LayerError::QueueUnderflow { queue: "backward" });
        }
        match (self.inputs.pop_front(), self.gradients.pop_front()) {
            (Some(x), Some(dy)) => Ok((x, dy)),
            _ => Err(LayerError::QueueUnderflow { queue: "forward" }),
        }
    }

    pub fn pending_inputs(&self) -> usize {
        self.inputs.len()
    }

    pub fn pending_gradients(&self) -> usize {
        self.gradients.len()
    }

    pub fn clear(&mut self) {
        self.inputs.clear();
        self.gradients.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    fn t(v: f32) -> Tensor {
        arr1(&[v]).into_dyn()
    }

    #[test]
    fn test_pairs_oldest_first() {
        let mut queue = GradientQueue::new();
        queue.push_input(t(1.0));
        queue.push_input(t(2.0));

        assert_eq!(queue.paired_input().unwrap(), &t(1.0));
        queue.push_gradient(t(10.0));
        assert_eq!(queue.paired_input().unwrap(), &t(2.0));
        queue.push_gradient(t(20.0));

        assert_eq!(queue.pop_pair().unwrap(), (t(1.0), t(10.0)));
        assert_eq!(queue.pop_pair().unwrap(), (t(2.0), t(20.0)));
    }

    #[test]
    fn test_paired_input_underflow() {
        let mut queue = GradientQueue::new();
        queue.push_input(t(1.0));
        queue.push_gradient(t(1.0));

        assert!(matches!(
            queue.paired_input(),
            Err(LayerError::QueueUnderflow { queue: "forward" })
        ));
    }

    #[test]
    fn test_pop_pair_underflow_is_atomic() {
        let mut queue = GradientQueue::new();
        queue.push_input(t(1.0));

        let err = queue.pop_pair().unwrap_err();
        assert!(matches!(err, LayerError::QueueUnderflow { queue: "backward" }));
        assert_eq!(queue.pending_inputs(), 1);

        queue.clear();
        let err = queue.pop_pair().unwrap_err();
        assert!(matches!(err, LayerError::QueueUnderflow { queue: "forward" }));
    }
}
