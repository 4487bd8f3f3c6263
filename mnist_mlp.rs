// mnist_mlp.rs
// Multi-layer perceptron for MNIST: 784 -> 128 (ReLU) -> 10.
// Expected files under `data_dir` (default ./data):
//   train-images-idx3-ubyte
//   train-labels-idx1-ubyte
//   t10k-images-idx3-ubyte
//   t10k-labels-idx1-ubyte
//
// Usage: mnist_mlp [config.json]
// The config may name an architecture file that replaces the built-in network.

use neural_layers::architecture::{build_network, load_architecture};
use neural_layers::config::{build_optimizer, load_config, TrainingConfig};
use neural_layers::datasets::{Dataset, Mnist};
use neural_layers::functions::ReLU;
use neural_layers::initializers::LeCunNormal;
use neural_layers::layers::Linear;
use neural_layers::network::Sequential;
use neural_layers::optimizers::Optimizer;
use neural_layers::training::{evaluate, train_epoch, EpochStats};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::error::Error;
use std::process;
use std::time::Instant;
use tracing::{error, info, Level};

// MNIST constants (images are flattened 28x28).
const NUM_INPUTS: usize = 28 * 28;
const NUM_HIDDEN: usize = 128;
const NUM_CLASSES: usize = 10;
const PIXEL_SCALE: f32 = 1.0 / 255.0;

fn initializer(seed: Option<u64>, offset: u64) -> LeCunNormal {
    match seed {
        Some(seed) => LeCunNormal::seeded(seed.wrapping_add(offset)),
        None => LeCunNormal::new(),
    }
}

fn default_network(
    optimizer: &dyn Optimizer,
    seed: Option<u64>,
) -> Result<Sequential, Box<dyn Error>> {
    let mut net = Sequential::new();
    net.push(Linear::with_initializer(
        NUM_INPUTS,
        NUM_HIDDEN,
        optimizer,
        &mut initializer(seed, 0),
    )?);
    net.push(ReLU::new());
    net.push(Linear::with_initializer(
        NUM_HIDDEN,
        NUM_CLASSES,
        optimizer,
        &mut initializer(seed, 2),
    )?);
    Ok(net)
}

/// Config from the first CLI argument, defaults when none is given.
fn config_from_args(args: &[String]) -> Result<TrainingConfig, Box<dyn Error>> {
    match args.get(1) {
        Some(path) => load_config(path),
        None => Ok(TrainingConfig::default()),
    }
}

fn load_split(config: &TrainingConfig) -> Result<(Dataset, Dataset), Box<dyn Error>> {
    let mut train = Mnist::training(&config.data_dir, true)?;
    let mut test = Mnist::test(&config.data_dir, true)?;
    if let Some(n) = config.train_samples {
        train = train.take(n);
    }
    if let Some(n) = config.test_samples {
        test = test.take(n);
    }
    train.scale_images(PIXEL_SCALE);
    test.scale_images(PIXEL_SCALE);
    Ok((train, test))
}

fn train(
    net: &mut Sequential,
    train_set: &mut Dataset,
    config: &TrainingConfig,
) -> Result<(), Box<dyn Error>> {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    for epoch in 0..config.epochs {
        let start = Instant::now();
        train_set.shuffle(&mut rng);
        let stats = train_epoch(net, train_set, config.batch_size)?;
        info!(
            epoch = epoch + 1,
            loss = stats.loss,
            accuracy = stats.accuracy,
            seconds = start.elapsed().as_secs_f64(),
            "epoch complete"
        );
    }
    Ok(())
}

fn run(config: &TrainingConfig) -> Result<EpochStats, Box<dyn Error>> {
    info!(data_dir = %config.data_dir, "loading MNIST");
    let (mut train_set, test_set) = load_split(config)?;
    info!(train = train_set.len(), test = test_set.len(), "loaded MNIST");

    let optimizer = build_optimizer(config)?;
    let mut net = match &config.architecture {
        Some(path) => build_network(&load_architecture(path)?, &*optimizer, config.seed)?,
        None => default_network(&*optimizer, config.seed)?,
    };
    info!(
        layers = ?net.names(),
        epochs = config.epochs,
        batch_size = config.batch_size,
        learning_rate = config.learning_rate,
        "training MLP"
    );

    train(&mut net, &mut train_set, config)?;

    let stats = evaluate(&mut net, &test_set, config.batch_size)?;
    info!(accuracy = stats.accuracy * 100.0, "test accuracy (%)");
    Ok(stats)
}

fn main() {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let args: Vec<String> = std::env::args().collect();
    let result = config_from_args(&args).and_then(|config| run(&config));
    if let Err(err) = result {
        error!("{}", err);
        process::exit(1);
    }
}
