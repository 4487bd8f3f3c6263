// mnist_cnn.rs
// Small CNN for MNIST built from the library's Conv2D and Linear layers.
// Topology: 1x28x28 -> conv 3x3 stride 2 pad 1 (8 filters) -> ReLU -> flatten -> FC(10).
// Expected files under `data_dir` (default ./data):
//   train-images-idx3-ubyte
//   train-labels-idx1-ubyte
//   t10k-images-idx3-ubyte
//   t10k-labels-idx1-ubyte
//
// Usage: mnist_cnn [config.json]

use neural_layers::config::{build_optimizer, load_config, TrainingConfig};
use neural_layers::datasets::{Dataset, Mnist};
use neural_layers::functions::{Flatten, ReLU};
use neural_layers::initializers::LeCunNormal;
use neural_layers::layers::{Conv2D, Linear};
use neural_layers::network::Sequential;
use neural_layers::optimizers::Optimizer;
use neural_layers::training::{evaluate, train_epoch, EpochStats};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::error::Error;
use std::process;
use std::time::Instant;
use tracing::{error, info, Level};

const NUM_CLASSES: usize = 10;
const PIXEL_SCALE: f32 = 1.0 / 255.0;

// CNN topology.
const CONV_OUT: usize = 8;
const KERNEL: usize = 3;
const STRIDE: usize = 2;
const PAD: usize = 1;
const CONV_H: usize = (28 + 2 * PAD - KERNEL) / STRIDE + 1; // 14
const FC_IN: usize = CONV_OUT * CONV_H * CONV_H; // 8*14*14 = 1568

fn initializer(seed: Option<u64>, offset: u64) -> LeCunNormal {
    match seed {
        Some(seed) => LeCunNormal::seeded(seed.wrapping_add(offset)),
        None => LeCunNormal::new(),
    }
}

fn build_cnn(optimizer: &dyn Optimizer, seed: Option<u64>) -> Result<Sequential, Box<dyn Error>> {
    let conv = Conv2D::new(CONV_OUT, KERNEL, STRIDE, PAD, optimizer)?
        .with_initializer(initializer(seed, 0));

    let mut net = Sequential::new();
    net.push(conv);
    net.push(ReLU::new());
    net.push(Flatten::new());
    net.push(Linear::with_initializer(
        FC_IN,
        NUM_CLASSES,
        optimizer,
        &mut initializer(seed, 3),
    )?);
    Ok(net)
}

fn config_from_args(args: &[String]) -> Result<TrainingConfig, Box<dyn Error>> {
    match args.get(1) {
        Some(path) => load_config(path),
        None => Ok(TrainingConfig {
            batch_size: 32,
            ..TrainingConfig::default()
        }),
    }
}

fn load_split(config: &TrainingConfig) -> Result<(Dataset, Dataset), Box<dyn Error>> {
    // [N, 1, 28, 28]
    let mut train = Mnist::training(&config.data_dir, false)?;
    let mut test = Mnist::test(&config.data_dir, false)?;
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

fn run(config: &TrainingConfig) -> Result<EpochStats, Box<dyn Error>> {
    info!(data_dir = %config.data_dir, "loading MNIST");
    let (mut train_set, test_set) = load_split(config)?;
    info!(train = train_set.len(), test = test_set.len(), "loaded MNIST");

    let optimizer = build_optimizer(config)?;
    let mut net = build_cnn(&*optimizer, config.seed)?;
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    info!(
        epochs = config.epochs,
        batch_size = config.batch_size,
        learning_rate = config.learning_rate,
        "training CNN"
    );
    for epoch in 0..config.epochs {
        let start = Instant::now();
        train_set.shuffle(&mut rng);
        let stats = train_epoch(&mut net, &train_set, config.batch_size)?;
        info!(
            epoch = epoch + 1,
            loss = stats.loss,
            accuracy = stats.accuracy,
            seconds = start.elapsed().as_secs_f64(),
            "epoch complete"
        );
    }

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
