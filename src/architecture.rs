//! Architecture configuration structures
//!
//! This module provides configuration structures for defining neural network architectures
//! via JSON configuration files. This enables architecture experimentation without code changes.

use crate::config::invalid;
use crate::functions::{Conv2dParams, Flatten, ReLU, Sigmoid};
use crate::initializers::LeCunNormal;
use crate::layers::{Conv2D, Linear};
use crate::network::Sequential;
use crate::optimizers::Optimizer;
use serde::Deserialize;
use std::error::Error;
use std::fs;

/// Layer type names accepted in `layer_type`.
pub const LAYER_TYPES: [&str; 5] = ["linear", "conv2d", "relu", "sigmoid", "flatten"];

/// Configuration for a single entry in the network.
///
/// Defines the layer type and its parameters. Different layer types require different fields:
///
/// - **Linear**: Requires `input_size` and `output_size`
/// - **Conv2D**: Requires `out_channels` and `kernel_size`, optional `stride` (default 1),
///   `padding` (default 0) and `cover_all` (default false). The input channel count is
///   taken from the first input the layer sees.
/// - **ReLU**, **Sigmoid**, **Flatten**: No parameters
///
/// # Examples
///
/// ```json
/// {
///   "layer_type": "linear",
///   "input_size": 784,
///   "output_size": 128
/// }
/// ```
///
/// ```json
/// {
///   "layer_type": "conv2d",
///   "out_channels": 8,
///   "kernel_size": 3,
///   "padding": 1
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct LayerConfig {
    /// Type of layer: "linear", "conv2d", "relu", "sigmoid", or "flatten"
    pub layer_type: String,

    // Linear layer parameters
    pub input_size: Option<usize>,
    pub output_size: Option<usize>,

    // Conv2D layer parameters
    pub out_channels: Option<usize>,
    /// Kernel size (square kernel)
    pub kernel_size: Option<usize>,
    pub stride: Option<usize>,
    pub padding: Option<usize>,
    pub cover_all: Option<bool>,
}

/// Configuration for the entire network.
///
/// Layers are applied in the order they appear in the configuration.
///
/// # Example
///
/// ```json
/// {
///   "layers": [
///     { "layer_type": "linear", "input_size": 784, "output_size": 128 },
///     { "layer_type": "relu" },
///     { "layer_type": "linear", "input_size": 128, "output_size": 10 }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ArchitectureConfig {
    /// Sequence of layer configurations defining the network structure
    pub layers: Vec<LayerConfig>,
}

/// Loads an architecture configuration from a JSON file.
///
/// Reads the file at `path`, deserializes it into an `ArchitectureConfig` and
/// validates it.
///
/// # Examples
///
/// ```no_run
/// use neural_layers::architecture::load_architecture;
///
/// let arch = load_architecture("config/architectures/mlp.json").unwrap();
/// assert!(!arch.layers.is_empty());
/// ```
pub fn load_architecture(path: &str) -> Result<ArchitectureConfig, Box<dyn Error>> {
    let contents = fs::read_to_string(path)?;
    let config: ArchitectureConfig = serde_json::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}

fn require(value: Option<usize>, index: usize, field: &str) -> Result<usize, Box<dyn Error>> {
    match value {
        None => Err(invalid(format!("Layer {}: missing '{}'", index, field))),
        Some(0) => Err(invalid(format!(
            "Layer {}: {} must be greater than 0",
            index, field
        ))),
        Some(v) => Ok(v),
    }
}

impl ArchitectureConfig {
    /// Checks that every layer has the fields its type requires and that
    /// consecutive linear layers agree on their sizes.
    ///
    /// Activations between two linear layers do not change the width, so they
    /// are skipped when comparing sizes. A convolution or flatten resets the
    /// check, since their output width depends on the input image.
    pub fn validate(&self) -> Result<(), Box<dyn Error>> {
        if self.layers.is_empty() {
            return Err(invalid("Architecture must contain at least one layer"));
        }

        let mut width: Option<usize> = None;
        for (i, layer) in self.layers.iter().enumerate() {
            match layer.layer_type.to_lowercase().as_str() {
                "linear" => {
                    let input_size = require(layer.input_size, i, "input_size")?;
                    let output_size = require(layer.output_size, i, "output_size")?;
                    if let Some(previous) = width {
                        if previous != input_size {
                            return Err(invalid(format!(
                                "Layer connection mismatch: Layer {} input size ({}) does not match previous output size ({})",
                                i, input_size, previous
                            )));
                        }
                    }
                    width = Some(output_size);
                }
                "conv2d" => {
                    require(layer.out_channels, i, "out_channels")?;
                    require(layer.kernel_size, i, "kernel_size")?;
                    if layer.stride == Some(0) {
                        return Err(invalid(format!(
                            "Layer {}: stride must be greater than 0",
                            i
                        )));
                    }
                    width = None;
                }
                "flatten" => width = None,
                "relu" | "sigmoid" => {}
                _ => {
                    return Err(invalid(format!(
                        "Layer {}: Invalid layer type '{}'. Must be one of: {}",
                        i,
                        layer.layer_type,
                        LAYER_TYPES.join(", ")
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Builds a network from an architecture configuration.
///
/// Every trainable layer receives its own clones of `optimizer`. With a `seed`
/// the weights are reproducible: layer `i` draws from `LeCunNormal::seeded(seed + i)`.
///
/// # Examples
///
/// ```no_run
/// use neural_layers::architecture::{build_network, load_architecture};
/// use neural_layers::optimizers::SGD;
///
/// let config = load_architecture("config/architectures/mlp.json").unwrap();
/// let net = build_network(&config, &SGD::new(0.01), Some(42)).unwrap();
/// assert_eq!(net.len(), config.layers.len());
/// ```
pub fn build_network(
    config: &ArchitectureConfig,
    optimizer: &dyn Optimizer,
    seed: Option<u64>,
) -> Result<Sequential, Box<dyn Error>> {
    config.validate()?;

    let mut net = Sequential::new();
    for (i, layer) in config.layers.iter().enumerate() {
        let initializer = match seed {
            Some(seed) => LeCunNormal::seeded(seed.wrapping_add(i as u64)),
            None => LeCunNormal::new(),
        };

        match layer.layer_type.to_lowercase().as_str() {
            "linear" => {
                let input_size = require(layer.input_size, i, "input_size")?;
                let output_size = require(layer.output_size, i, "output_size")?;
                let mut initializer = initializer;
                net.push(Linear::with_initializer(
                    input_size,
                    output_size,
                    optimizer,
                    &mut initializer,
                )?);
            }
            "conv2d" => {
                let kernel = require(layer.kernel_size, i, "kernel_size")?;
                let stride = layer.stride.unwrap_or(1);
                let padding = layer.padding.unwrap_or(0);
                let params = Conv2dParams::new(
                    (kernel, kernel),
                    (stride, stride),
                    (padding, padding),
                    layer.cover_all.unwrap_or(false),
                )?;
                let out_channels = require(layer.out_channels, i, "out_channels")?;
                let conv = Conv2D::with_params(out_channels, params, optimizer)?
                    .with_initializer(initializer);
                net.push(conv);
            }
            "relu" => net.push(ReLU::new()),
            "sigmoid" => net.push(Sigmoid::new()),
            "flatten" => net.push(Flatten::new()),
            other => return Err(invalid(format!("Unknown layer type: {}", other))),
        }
    }

    Ok(net)
}
