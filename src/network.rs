//! Sequential composition of functions and layers

use crate::error::Result;
use crate::functions::Function;
use crate::Tensor;

/// An ordered chain of functions.
///
/// `forward` runs the members in order, `backward` runs them in reverse, and
/// `update`/`clear_cache` reach every member. A `Sequential` is itself a
/// [`Function`], so chains nest.
///
/// # Example
///
/// ```
/// use neural_layers::functions::{Function, ReLU};
/// use neural_layers::layers::Linear;
/// use neural_layers::network::Sequential;
/// use neural_layers::optimizers::SGD;
/// use ndarray::Array2;
///
/// let sgd = SGD::new(0.1);
/// let mut net = Sequential::new();
/// net.push(Linear::new(4, 8, &sgd).unwrap());
/// net.push(ReLU::new());
/// net.push(Linear::new(8, 2, &sgd).unwrap());
///
/// let y = net.forward(&Array2::<f32>::ones((5, 4)).into_dyn()).unwrap();
/// assert_eq!(y.shape(), &[5, 2]);
/// ```
#[derive(Default)]
pub struct Sequential {
    members: Vec<Box<dyn Function>>,
}

impl Sequential {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, function: impl Function + 'static) {
        self.members.push(Box::new(function));
    }

    pub fn push_boxed(&mut self, function: Box<dyn Function>) {
        self.members.push(function);
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member names in order, e.g. `["conv2d", "relu", "flatten", "linear"]`.
    pub fn names(&self) -> Vec<&'static str> {
        self.members.iter().map(|m| m.name()).collect()
    }
}

impl Function for Sequential {
    fn forward(&mut self, x: &Tensor) -> Result<Tensor> {
        let mut out = x.clone();
        for member in &mut self.members {
            out = member.forward(&out)?;
        }
        Ok(out)
    }

    fn backward(&mut self, dy: &Tensor) -> Result<Tensor> {
        let mut grad = dy.clone();
        for member in self.members.iter_mut().rev() {
            grad = member.backward(&grad)?;
        }
        Ok(grad)
    }

    fn update(&mut self) -> Result<()> {
        for member in &mut self.members {
            member.update()?;
        }
        Ok(())
    }

    fn clear_cache(&mut self) {
        for member in &mut self.members {
            member.clear_cache();
        }
    }

    fn name(&self) -> &'static str {
        "sequential"
    }
}
