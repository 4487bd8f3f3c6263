//! Epoch training and evaluation helpers
//!
//! Each training step runs `forward`, the softmax cross-entropy loss,
//! `backward` and `update` for one batch. Evaluation runs `forward` only and
//! clears the cached activations afterwards.

use crate::datasets::Dataset;
use crate::error::Result;
use crate::functions::loss::{accuracy, softmax_cross_entropy};
use crate::functions::Function;
use tracing::{debug, info};

/// Loss and accuracy averaged over the samples of one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EpochStats {
    pub loss: f32,
    pub accuracy: f32,
    pub samples: usize,
}

impl EpochStats {
    fn add_batch(&mut self, loss: f32, accuracy: f32, size: usize) {
        self.loss += loss * size as f32;
        self.accuracy += accuracy * size as f32;
        self.samples += size;
    }

    fn finish(mut self) -> Self {
        if self.samples > 0 {
            self.loss /= self.samples as f32;
            self.accuracy /= self.samples as f32;
        }
        self
    }
}

/// One pass over `dataset` in order, updating `net` after every batch.
///
/// Shuffle the dataset between epochs with [`Dataset::shuffle`].
pub fn train_epoch<N>(net: &mut N, dataset: &Dataset, batch_size: usize) -> Result<EpochStats>
where
    N: Function + ?Sized,
{
    let mut stats = EpochStats::default();

    for (step, (images, labels)) in dataset.batches(batch_size).enumerate() {
        let logits = net.forward(&images)?;
        let (loss, dlogits) = softmax_cross_entropy(&logits, labels)?;
        let batch_accuracy = accuracy(&logits, labels)?;

        net.backward(&dlogits)?;
        net.update()?;

        stats.add_batch(loss, batch_accuracy, labels.len());
        debug!(step, loss, accuracy = batch_accuracy, "trained batch");
    }

    let stats = stats.finish();
    info!(
        samples = stats.samples,
        loss = stats.loss,
        accuracy = stats.accuracy,
        "finished training epoch"
    );
    Ok(stats)
}

/// Loss and accuracy of `net` on `dataset` without updating it.
///
/// Caches filled by the forward passes are cleared before returning, also on error.
pub fn evaluate<N>(net: &mut N, dataset: &Dataset, batch_size: usize) -> Result<EpochStats>
where
    N: Function + ?Sized,
{
    let result = evaluate_batches(net, dataset, batch_size);
    net.clear_cache();

    let stats = result?;
    info!(
        samples = stats.samples,
        loss = stats.loss,
        accuracy = stats.accuracy,
        "evaluated"
    );
    Ok(stats)
}

fn evaluate_batches<N>(net: &mut N, dataset: &Dataset, batch_size: usize) -> Result<EpochStats>
where
    N: Function + ?Sized,
{
    let mut stats = EpochStats::default();
    for (images, labels) in dataset.batches(batch_size) {
        let logits = net.forward(&images)?;
        let (loss, _) = softmax_cross_entropy(&logits, labels)?;
        stats.add_batch(loss, accuracy(&logits, labels)?, labels.len());
        net.clear_cache();
    }
    Ok(stats.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::initializers::LeCunNormal;
    use crate::layers::{Layer, Linear};
    use crate::network::Sequential;
    use crate::optimizers::SGD;
    use ndarray::Array2;

    /// Two separable clusters: label 0 at (-1, -1), label 1 at (1, 1).
    fn clusters(n: usize) -> Dataset {
        let images =
            Array2::from_shape_fn((n, 2), |(i, _)| if i % 2 == 0 { -1.0f32 } else { 1.0 });
        Dataset::new(images.into_dyn(), (0..n).map(|i| i % 2).collect()).unwrap()
    }

    #[test]
    fn test_training_reduces_loss() {
        let data = clusters(32);
        let mut layer =
            Linear::with_initializer(2, 2, &SGD::new(0.5), &mut LeCunNormal::seeded(0)).unwrap();

        let before = evaluate(&mut layer, &data, 8).unwrap();
        for _ in 0..5 {
            train_epoch(&mut layer, &data, 8).unwrap();
        }
        let after = evaluate(&mut layer, &data, 8).unwrap();

        assert!(after.loss < before.loss);
        assert_eq!(after.accuracy, 1.0);
        assert_eq!(after.samples, 32);
    }

    #[test]
    fn test_evaluate_leaves_no_cached_inputs() {
        let data = clusters(10);
        let mut layer = Linear::new(2, 2, &SGD::new(0.1)).unwrap();

        evaluate(&mut layer, &data, 4).unwrap();
        assert_eq!(layer.pending_inputs(), 0);
    }

    #[test]
    fn test_train_epoch_through_sequential() {
        let data = clusters(12);
        let mut net = Sequential::new();
        net.push(Linear::new(2, 2, &SGD::new(0.1)).unwrap());

        let stats = train_epoch(&mut net, &data, 5).unwrap();
        assert_eq!(stats.samples, 12);
        assert!(stats.loss.is_finite());
    }
}
