//! Shared utilities for testing and debugging layers
//!
//! This module provides numerical gradient checking used to verify the
//! analytical backward passes of functions and layers.

pub mod gradcheck;

pub use gradcheck::{numerical_gradient, relative_error};
