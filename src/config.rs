//! Configuration structures for training
//!
//! This module provides the training configuration read by the MNIST binaries:
//! data location, epoch and batch settings, and the optimizer rule handed to
//! every trainable layer.

use crate::optimizers::{Adam, Momentum, Optimizer, SGD};
use serde::Deserialize;
use std::error::Error;
use std::fs;

/// Optimizer names accepted in the `optimizer` field.
pub const OPTIMIZERS: [&str; 3] = ["sgd", "momentum", "adam"];

/// Configuration for a training run.
///
/// Every field has a default, so `{}` is a valid configuration. Optimizer
/// specific fields are optional:
///
/// - **sgd**: only `learning_rate` (default)
/// - **momentum**: optional `momentum` (default 0.9)
/// - **adam**: uses β1 = 0.9, β2 = 0.999, ε = 1e-8
///
/// # Example
///
/// ```json
/// {
///   "data_dir": "./data",
///   "epochs": 5,
///   "batch_size": 64,
///   "learning_rate": 0.05,
///   "optimizer": "momentum",
///   "momentum": 0.9,
///   "seed": 1,
///   "architecture": "config/architectures/mlp.json"
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Directory holding the four MNIST IDX files
    pub data_dir: String,

    /// Number of passes over the training set
    pub epochs: usize,

    /// Samples per forward/backward/update step
    pub batch_size: usize,

    /// Step size shared by all optimizers
    pub learning_rate: f32,

    /// Optimizer type: "sgd", "momentum", or "adam" (default "sgd")
    pub optimizer: Option<String>,

    /// Velocity decay for the momentum optimizer (default 0.9)
    pub momentum: Option<f32>,

    /// Seed for weight initialization and shuffling; entropy when absent
    pub seed: Option<u64>,

    /// Use only the first N training samples
    pub train_samples: Option<usize>,

    /// Use only the first N test samples
    pub test_samples: Option<usize>,

    /// Path to an architecture JSON file; the binary's built-in network when absent
    pub architecture: Option<String>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
            epochs: 1,
            batch_size: 64,
            learning_rate: 0.01,
            optimizer: None,
            momentum: None,
            seed: None,
            train_samples: None,
            test_samples: None,
            architecture: None,
        }
    }
}

pub(crate) fn invalid(message: impl Into<String>) -> Box<dyn Error> {
    Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        message.into(),
    ))
}

/// Loads a training configuration from a JSON file.
///
/// Reads the file at `path` and deserializes its JSON contents into a `TrainingConfig`.
///
/// # Returns
///
/// `Ok(TrainingConfig)` on success, or an error if the file cannot be read, the
/// JSON is invalid, or a value is out of range.
///
/// # Examples
///
/// ```no_run
/// use neural_layers::config::load_config;
///
/// let cfg = load_config("config/mnist_mlp.json").unwrap();
/// assert!(cfg.epochs > 0);
/// ```
pub fn load_config(path: &str) -> Result<TrainingConfig, Box<dyn Error>> {
    let contents = fs::read_to_string(path)?;
    let config: TrainingConfig = serde_json::from_str(&contents)?;
    validate_config(&config)?;
    Ok(config)
}

/// Range checks applied by [`load_config`].
pub fn validate_config(config: &TrainingConfig) -> Result<(), Box<dyn Error>> {
    if config.epochs == 0 {
        return Err(invalid("epochs must be greater than 0"));
    }
    if config.batch_size == 0 {
        return Err(invalid("batch_size must be greater than 0"));
    }
    if !(config.learning_rate.is_finite() && config.learning_rate > 0.0) {
        return Err(invalid("learning_rate must be positive"));
    }

    if let Some(ref optimizer) = config.optimizer {
        if !OPTIMIZERS.contains(&optimizer.to_lowercase().as_str()) {
            return Err(invalid(format!(
                "Invalid optimizer '{}'. Must be one of: {}",
                optimizer,
                OPTIMIZERS.join(", ")
            )));
        }
    }

    if let Some(momentum) = config.momentum {
        if !(0.0..1.0).contains(&momentum) {
            return Err(invalid("momentum must be in range [0.0, 1.0)"));
        }
    }

    Ok(())
}

/// Creates the optimizer rule named by `config.optimizer`.
///
/// Layers clone the returned rule once per parameter.
pub fn build_optimizer(config: &TrainingConfig) -> Result<Box<dyn Optimizer>, Box<dyn Error>> {
    let name = config
        .optimizer
        .as_deref()
        .unwrap_or("sgd")
        .to_lowercase();

    match name.as_str() {
        "sgd" => Ok(Box::new(SGD::new(config.learning_rate))),
        "momentum" => Ok(Box::new(Momentum::new(
            config.learning_rate,
            config.momentum.unwrap_or(0.9),
        ))),
        "adam" => Ok(Box::new(Adam::with_learning_rate(config.learning_rate))),
        other => Err(invalid(format!("Unknown optimizer: {}", other))),
    }
}
