//! Layer abstractions for neural networks
//!
//! This module provides the Layer trait and the trainable layer types built on
//! the kernels in [`functions`](crate::functions).

mod r#trait;
pub mod conv2d;
pub mod linear;
pub mod queue;

// Re-export the Layer trait for convenience
pub use conv2d::Conv2D;
pub use linear::Linear;
pub use queue::GradientQueue;
pub use r#trait::Layer;
