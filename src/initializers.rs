//! Parameter initializers
//!
//! An initializer turns a parameter shape into an initial tensor. Layers call it
//! once: Linear at construction, Conv2D on its first forward pass once the input
//! channel count is known.
//!
//! Fan-in and fan-out follow the parameter layouts used in this crate:
//!
//! - `[n_input, n_output]` (linear weight): fan_in = n_input, fan_out = n_output
//! - `[out, in, kh, kw]` (convolution filters): fan_in = in·kh·kw, fan_out = out·kh·kw
//! - `[n]` (bias): fan_in = fan_out = n

use crate::Tensor;
use ndarray::IxDyn;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{StandardNormal, Uniform};

/// Produces an initial parameter tensor for a shape.
pub trait Initializer {
    fn initialize(&mut self, shape: &[usize]) -> Tensor;
}

impl<F> Initializer for F
where
    F: FnMut(&[usize]) -> Tensor,
{
    fn initialize(&mut self, shape: &[usize]) -> Tensor {
        self(shape)
    }
}

/// `(fan_in, fan_out)` of a parameter shape, each at least 1.
pub fn fans(shape: &[usize]) -> (usize, usize) {
    let (fan_in, fan_out) = match shape {
        [] => (1, 1),
        [n] => (*n, *n),
        [n_in, n_out] => (*n_in, *n_out),
        [out, inp, rest @ ..] => {
            let receptive: usize = rest.iter().product();
            (inp * receptive, out * receptive)
        }
    };
    (fan_in.max(1), fan_out.max(1))
}

fn rng_from(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Normal distribution with standard deviation `scale * sqrt(1 / fan_in)`.
///
/// Default initializer for both Linear and Conv2D.
#[derive(Debug, Clone)]
pub struct LeCunNormal {
    scale: f32,
    rng: StdRng,
}

impl LeCunNormal {
    /// Seeded from system entropy.
    pub fn new() -> Self {
        Self {
            scale: 1.0,
            rng: rng_from(None),
        }
    }

    /// Deterministic initializer for reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self {
            scale: 1.0,
            rng: rng_from(Some(seed)),
        }
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }
}

impl Default for LeCunNormal {
    fn default() -> Self {
        Self::new()
    }
}

impl Initializer for LeCunNormal {
    fn initialize(&mut self, shape: &[usize]) -> Tensor {
        let (fan_in, _) = fans(shape);
        let std = self.scale * (1.0 / fan_in as f32).sqrt();
        Tensor::random_using(IxDyn(shape), StandardNormal, &mut self.rng) * std
    }
}

/// Normal distribution with standard deviation `sqrt(2 / fan_in)`, suited to ReLU networks.
#[derive(Debug, Clone)]
pub struct HeNormal {
    rng: StdRng,
}

impl HeNormal {
    pub fn new() -> Self {
        Self { rng: rng_from(None) }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: rng_from(Some(seed)),
        }
    }
}

impl Default for HeNormal {
    fn default() -> Self {
        Self::new()
    }
}

impl Initializer for HeNormal {
    fn initialize(&mut self, shape: &[usize]) -> Tensor {
        let (fan_in, _) = fans(shape);
        let std = (2.0 / fan_in as f32).sqrt();
        Tensor::random_using(IxDyn(shape), StandardNormal, &mut self.rng) * std
    }
}

/// Xavier/Glorot uniform: samples from `[-limit, limit]` with
/// `limit = sqrt(6 / (fan_in + fan_out))`.
#[derive(Debug, Clone)]
pub struct GlorotUniform {
    rng: StdRng,
}

impl GlorotUniform {
    pub fn new() -> Self {
        Self { rng: rng_from(None) }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: rng_from(Some(seed)),
        }
    }
}

impl Default for GlorotUniform {
    fn default() -> Self {
        Self::new()
    }
}

impl Initializer for GlorotUniform {
    fn initialize(&mut self, shape: &[usize]) -> Tensor {
        let (fan_in, fan_out) = fans(shape);
        let limit = (6.0 / (fan_in + fan_out) as f32).sqrt();
        Tensor::random_using(IxDyn(shape), Uniform::new_inclusive(-1.0f32, 1.0), &mut self.rng)
            * limit
    }
}

/// Fills every element with the same value.
#[derive(Debug, Clone, Copy, Default)]
pub struct Constant(pub f32);

impl Initializer for Constant {
    fn initialize(&mut self, shape: &[usize]) -> Tensor {
        Tensor::from_elem(IxDyn(shape), self.0)
    }
}
