//! Softmax cross-entropy loss and classification accuracy

use crate::error::{LayerError, Result};
use crate::functions::view_as;
use crate::Tensor;
use ndarray::{Array2, Ix2};

const PROB_EPS: f32 = 1e-9;

/// Softmax applied row-wise, using max-subtraction for numerical stability.
pub fn softmax_rows(logits: &Tensor) -> Result<Array2<f32>> {
    let logits = view_as::<Ix2>(logits, "softmax input", "[batch, classes]")?;
    let mut probs = logits.to_owned();
    for mut row in probs.rows_mut() {
        let max_value = row.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
        row.mapv_inplace(|v| (v - max_value).exp());
        let sum = row.sum();
        row.mapv_inplace(|v| v / sum);
    }
    Ok(probs)
}

fn check_labels(rows: usize, classes: usize, labels: &[usize]) -> Result<()> {
    if labels.len() != rows {
        return Err(LayerError::shape_mismatch("labels", [rows], [labels.len()]));
    }
    if let Some(&bad) = labels.iter().find(|&&l| l >= classes) {
        return Err(LayerError::InvalidConfig(format!(
            "label {} out of range for {} classes",
            bad, classes
        )));
    }
    Ok(())
}

/// Mean softmax cross-entropy over the batch and its gradient with respect to the logits.
///
/// # Arguments
///
/// * `logits` - Unnormalized scores of shape `[batch, classes]`
/// * `labels` - Class index for each row
///
/// # Returns
///
/// `(loss, dlogits)` where `dlogits = (softmax(logits) - onehot(labels)) / batch`.
pub fn softmax_cross_entropy(logits: &Tensor, labels: &[usize]) -> Result<(f32, Tensor)> {
    let mut probs = softmax_rows(logits)?;
    let (rows, classes) = probs.dim();
    check_labels(rows, classes, labels)?;
    if rows == 0 {
        return Ok((0.0, probs.into_dyn()));
    }

    let scale = 1.0 / rows as f32;
    let mut loss = 0.0f32;
    for (mut row, &label) in probs.rows_mut().into_iter().zip(labels) {
        loss -= row[label].max(PROB_EPS).ln();
        row[label] -= 1.0;
        row *= scale;
    }
    Ok((loss * scale, probs.into_dyn()))
}

/// Fraction of rows whose arg-max matches the label.
pub fn accuracy(logits: &Tensor, labels: &[usize]) -> Result<f32> {
    let logits = view_as::<Ix2>(logits, "accuracy input", "[batch, classes]")?;
    check_labels(logits.nrows(), logits.ncols(), labels)?;
    if labels.is_empty() {
        return Ok(0.0);
    }

    let correct = logits
        .rows()
        .into_iter()
        .zip(labels)
        .filter(|(row, label)| {
            let mut best = 0usize;
            for (j, &v) in row.iter().enumerate() {
                if v > row[best] {
                    best = j;
                }
            }
            best == **label
        })
        .count();
    Ok(correct as f32 / labels.len() as f32)
}
