//! SGD with momentum
//!
//! `v = μ * v - η * g`, then `w = w + v`.

use crate::optimizers::{assert_same_shape, Optimizer};
use crate::Tensor;

/// Momentum SGD optimizer.
///
/// The velocity is allocated on the first update from the parameter's shape.
#[derive(Debug, Clone)]
pub struct Momentum {
    learning_rate: f32,
    momentum: f32,
    velocity: Option<Tensor>,
}

impl Momentum {
    /// # Typical Values
    ///
    /// learning_rate 0.01, momentum 0.9
    pub fn new(learning_rate: f32, momentum: f32) -> Self {
        Self {
            learning_rate,
            momentum,
            velocity: None,
        }
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    pub fn momentum(&self) -> f32 {
        self.momentum
    }
}

impl Optimizer for Momentum {
    fn update(&mut self, parameter: &mut Tensor, gradient: &Tensor) {
        assert_same_shape(parameter, gradient);

        if let Some(v) = &self.velocity {
            if v.shape() != parameter.shape() {
                self.velocity = None;
            }
        }
        let velocity = self
            .velocity
            .get_or_insert_with(|| Tensor::zeros(parameter.raw_dim()));
        *velocity *= self.momentum;
        velocity.scaled_add(-self.learning_rate, gradient);
        *parameter += &*velocity;
    }

    fn reset(&mut self) {
        self.velocity = None;
    }

    fn box_clone(&self) -> Box<dyn Optimizer> {
        Box::new(self.clone())
    }
}
