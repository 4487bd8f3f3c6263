//! MNIST IDX file reader
//!
//! IDX files start with a 4-byte magic number, a 4-byte item count and, for
//! images, 4-byte row and column counts, followed by one unsigned byte per
//! pixel or label in row-major order. The header is normally big-endian; files
//! whose magic number only matches when read little-endian are decoded
//! little-endian throughout.

use crate::datasets::Dataset;
use crate::error::DatasetError;
use crate::Tensor;
use ndarray::IxDyn;
use std::fs;
use std::path::Path;
use tracing::debug;

pub const IMAGE_MAGIC: u32 = 2051;
pub const LABEL_MAGIC: u32 = 2049;

pub const TRAIN_IMAGES: &str = "train-images-idx3-ubyte";
pub const TRAIN_LABELS: &str = "train-labels-idx1-ubyte";
pub const TEST_IMAGES: &str = "t10k-images-idx3-ubyte";
pub const TEST_LABELS: &str = "t10k-labels-idx1-ubyte";

/// Shape of the tensor returned by [`read_images`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageLayout {
    /// `[N, rows, cols]`
    #[default]
    Raw,
    /// `[N, 1, rows, cols]`, ready for a convolution
    Channels,
    /// `[N, rows * cols]`, ready for a linear layer
    Flat,
}

impl ImageLayout {
    pub fn from_flatten(flatten: bool) -> Self {
        if flatten {
            ImageLayout::Flat
        } else {
            ImageLayout::Channels
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    BigEndian,
    LittleEndian,
}

impl ByteOrder {
    fn decode(self, bytes: [u8; 4]) -> u32 {
        match self {
            ByteOrder::BigEndian => u32::from_be_bytes(bytes),
            ByteOrder::LittleEndian => u32::from_le_bytes(bytes),
        }
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, DatasetError> {
    fs::read(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn word(data: &[u8], index: usize) -> [u8; 4] {
    let start = index * 4;
    [data[start], data[start + 1], data[start + 2], data[start + 3]]
}

/// Decode the magic number and `dims` header integers that follow it.
///
/// Returns the detected byte order, the dimensions and the payload offset.
fn parse_header(
    path: &Path,
    data: &[u8],
    magic: u32,
    dims: usize,
) -> Result<(ByteOrder, Vec<usize>, usize), DatasetError> {
    let header_len = 4 * (1 + dims);
    if data.len() < header_len {
        return Err(DatasetError::Truncated {
            path: path.to_path_buf(),
            expected: header_len,
            actual: data.len(),
        });
    }

    let raw = word(data, 0);
    let order = if u32::from_be_bytes(raw) == magic {
        ByteOrder::BigEndian
    } else if u32::from_le_bytes(raw) == magic {
        ByteOrder::LittleEndian
    } else {
        return Err(DatasetError::BadMagic {
            path: path.to_path_buf(),
            found: u32::from_be_bytes(raw),
            expected: magic,
        });
    };

    let sizes = (1..=dims)
        .map(|i| order.decode(word(data, i)) as usize)
        .collect();
    Ok((order, sizes, header_len))
}

fn payload<'a>(
    path: &Path,
    data: &'a [u8],
    offset: usize,
    len: usize,
) -> Result<&'a [u8], DatasetError> {
    let expected = offset.saturating_add(len);
    data.get(offset..expected).ok_or_else(|| DatasetError::Truncated {
        path: path.to_path_buf(),
        expected,
        actual: data.len(),
    })
}

/// Read an IDX image file into a tensor of raw byte values (0–255).
///
/// # Errors
///
/// - `Io` if the file cannot be read
/// - `BadMagic` if the magic number is not 2051 in either byte order
/// - `Truncated` if the header or pixel payload is incomplete
pub fn read_images(path: impl AsRef<Path>, layout: ImageLayout) -> Result<Tensor, DatasetError> {
    let path = path.as_ref();
    let data = read_file(path)?;
    let (order, dims, offset) = parse_header(path, &data, IMAGE_MAGIC, 3)?;
    let (n_images, rows, cols) = (dims[0], dims[1], dims[2]);

    let len = n_images.saturating_mul(rows).saturating_mul(cols);
    let pixels: Vec<f32> = payload(path, &data, offset, len)?
        .iter()
        .map(|&b| f32::from(b))
        .collect();

    debug!(
        path = %path.display(),
        byte_order = ?order,
        n_images,
        rows,
        cols,
        "read image file"
    );

    let shape = match layout {
        ImageLayout::Raw => vec![n_images, rows, cols],
        ImageLayout::Channels => vec![n_images, 1, rows, cols],
        ImageLayout::Flat => vec![n_images, rows * cols],
    };
    Ok(Tensor::from_shape_vec(IxDyn(&shape), pixels)?)
}

/// Read an IDX label file into a tensor of shape `[N]`.
pub fn read_labels(path: impl AsRef<Path>) -> Result<Tensor, DatasetError> {
    let path = path.as_ref();
    let data = read_file(path)?;
    let (order, dims, offset) = parse_header(path, &data, LABEL_MAGIC, 1)?;
    let n_labels = dims[0];

    let labels: Vec<f32> = payload(path, &data, offset, n_labels)?
        .iter()
        .map(|&b| f32::from(b))
        .collect();

    debug!(path = %path.display(), byte_order = ?order, n_labels, "read label file");
    Ok(Tensor::from_shape_vec(IxDyn(&[n_labels]), labels)?)
}

/// The MNIST training and test splits stored under one directory with the
/// standard file names.
pub struct Mnist;

impl Mnist {
    /// `train-images-idx3-ubyte` + `train-labels-idx1-ubyte`.
    ///
    /// Images are `[N, 784]` when `flatten` is set and `[N, 1, 28, 28]` otherwise.
    pub fn training(dir: impl AsRef<Path>, flatten: bool) -> Result<Dataset, DatasetError> {
        Self::load(dir.as_ref(), TRAIN_IMAGES, TRAIN_LABELS, flatten)
    }

    /// `t10k-images-idx3-ubyte` + `t10k-labels-idx1-ubyte`.
    pub fn test(dir: impl AsRef<Path>, flatten: bool) -> Result<Dataset, DatasetError> {
        Self::load(dir.as_ref(), TEST_IMAGES, TEST_LABELS, flatten)
    }

    fn load(
        dir: &Path,
        images: &str,
        labels: &str,
        flatten: bool,
    ) -> Result<Dataset, DatasetError> {
        let images = read_images(dir.join(images), ImageLayout::from_flatten(flatten))?;
        let labels = read_labels(dir.join(labels))?;
        Dataset::new(images, labels.iter().map(|&l| l as usize).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn idx_file(bytes: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    fn image_bytes(header: [u32; 4], little_endian: bool, pixels: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        for value in header {
            if little_endian {
                bytes.extend_from_slice(&value.to_le_bytes());
            } else {
                bytes.extend_from_slice(&value.to_be_bytes());
            }
        }
        bytes.extend_from_slice(pixels);
        bytes
    }

    #[test]
    fn test_layouts() {
        let pixels: Vec<u8> = (0..12).collect();
        let file = idx_file(&image_bytes([IMAGE_MAGIC, 2, 2, 3], false, &pixels));

        let raw = read_images(file.path(), ImageLayout::Raw).unwrap();
        assert_eq!(raw.shape(), &[2, 2, 3]);
        assert_eq!(raw[[1, 0, 2]], 8.0);

        let channels = read_images(file.path(), ImageLayout::Channels).unwrap();
        assert_eq!(channels.shape(), &[2, 1, 2, 3]);

        let flat = read_images(file.path(), ImageLayout::Flat).unwrap();
        assert_eq!(flat.shape(), &[2, 6]);
        assert_eq!(flat[[1, 5]], 11.0);
    }

    #[test]
    fn test_little_endian_header_is_detected() {
        let pixels = [0u8, 128, 255, 7];
        let be = idx_file(&image_bytes([IMAGE_MAGIC, 1, 2, 2], false, &pixels));
        let le = idx_file(&image_bytes([IMAGE_MAGIC, 1, 2, 2], true, &pixels));

        let a = read_images(be.path(), ImageLayout::Raw).unwrap();
        let b = read_images(le.path(), ImageLayout::Raw).unwrap();
        assert_eq!(a, b);
        assert_eq!(a[[0, 1, 0]], 255.0);
    }

    #[test]
    fn test_bad_magic() {
        let file = idx_file(&image_bytes([1234, 1, 1, 1], false, &[0]));
        let err = read_images(file.path(), ImageLayout::Raw).unwrap_err();
        assert!(matches!(err, DatasetError::BadMagic { found: 1234, .. }));

        // a label file is not an image file
        let mut labels = LABEL_MAGIC.to_be_bytes().to_vec();
        labels.extend_from_slice(&1u32.to_be_bytes());
        labels.push(3);
        let file = idx_file(&labels);
        assert!(matches!(
            read_images(file.path(), ImageLayout::Raw),
            Err(DatasetError::BadMagic { .. }) | Err(DatasetError::Truncated { .. })
        ));
    }

    #[test]
    fn test_truncated_payload() {
        let file = idx_file(&image_bytes([IMAGE_MAGIC, 2, 2, 2], false, &[1, 2, 3]));
        let err = read_images(file.path(), ImageLayout::Raw).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::Truncated {
                expected: 24,
                actual: 19,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_labels(dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, DatasetError::Io { .. }));
    }

    #[test]
    fn test_labels() {
        let mut bytes = LABEL_MAGIC.to_le_bytes().to_vec();
        bytes.extend_from_slice(&3u32.to_le_bytes());
        bytes.extend_from_slice(&[7, 0, 9]);
        let file = idx_file(&bytes);

        let labels = read_labels(file.path()).unwrap();
        assert_eq!(labels.shape(), &[3]);
        assert_eq!(labels.iter().cloned().collect::<Vec<_>>(), vec![7.0, 0.0, 9.0]);
    }
}
