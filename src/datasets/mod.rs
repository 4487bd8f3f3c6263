//! In-memory datasets
//!
//! A [`Dataset`] pairs an image tensor whose first axis is the sample axis with
//! one class label per sample. The [`mnist`] module reads the MNIST IDX files.

pub mod mnist;

pub use mnist::{read_images, read_labels, ImageLayout, Mnist};

use crate::error::DatasetError;
use crate::Tensor;
use ndarray::{Axis, Slice};
use rand::seq::SliceRandom;
use rand::Rng;

#[derive(Debug, Clone)]
pub struct Dataset {
    images: Tensor,
    labels: Vec<usize>,
}

impl Dataset {
    /// # Errors
    ///
    /// `LengthMismatch` if the first axis of `images` and `labels` differ in length.
    pub fn new(images: Tensor, labels: Vec<usize>) -> Result<Self, DatasetError> {
        let n_images = images.shape().first().copied().unwrap_or(0);
        if n_images != labels.len() {
            return Err(DatasetError::LengthMismatch {
                images: n_images,
                labels: labels.len(),
            });
        }
        Ok(Self { images, labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn images(&self) -> &Tensor {
        &self.images
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Multiply every pixel by `factor`, e.g. `1.0 / 255.0` to map bytes into [0, 1].
    pub fn scale_images(&mut self, factor: f32) {
        self.images.mapv_inplace(|v| v * factor);
    }

    /// Permute the samples. Pass a seeded `StdRng` for a reproducible order.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.shuffle(rng);
        self.images = self.images.select(Axis(0), &order);
        self.labels = order.iter().map(|&i| self.labels[i]).collect();
    }

    /// Samples `start..start + size`, clipped to the end of the dataset.
    pub fn batch(&self, start: usize, size: usize) -> (Tensor, &[usize]) {
        let start = start.min(self.len());
        let end = start.saturating_add(size).min(self.len());
        let images = self
            .images
            .slice_axis(Axis(0), Slice::from(start..end))
            .to_owned();
        (images, &self.labels[start..end])
    }

    /// Consecutive batches of `batch_size` samples; the last one may be shorter.
    pub fn batches(&self, batch_size: usize) -> impl Iterator<Item = (Tensor, &[usize])> + '_ {
        let batch_size = batch_size.max(1);
        (0..self.len())
            .step_by(batch_size)
            .map(move |start| self.batch(start, batch_size))
    }

    /// The first `n` samples (all of them if `n` exceeds the length).
    pub fn take(&self, n: usize) -> Dataset {
        let (images, labels) = self.batch(0, n);
        Dataset {
            images,
            labels: labels.to_vec(),
        }
    }
}
