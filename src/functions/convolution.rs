//! 2D convolution kernels
//!
//! Pure functions implementing strided, zero-padded 2D convolution through
//! im2col: every receptive field of an image is unrolled into one column of a
//! patch matrix, so the convolution becomes a single matrix multiply per image.
//!
//! - `convolution_2d`: `[N, C, H, W] * [O, C, kh, kw] -> [N, O, oh, ow]`
//! - `deconvolution_2d`: transposed convolution, the input gradient of `convolution_2d`
//! - `convolution_2d_grad`: weight gradient from the input and the output gradient

use crate::error::{LayerError, Result};
use crate::functions::view_as;
use crate::Tensor;
use ndarray::{Array2, Array4, ArrayView2, ArrayView3, ArrayView4, ArrayViewMut3, Axis, Ix4};

/// Output length of a convolution along one axis.
///
/// Without `cover_all`: `(size + 2 * padding - kernel) / stride + 1`.
/// With `cover_all` a trailing partial window is kept:
/// `(size + 2 * padding - kernel + stride - 1) / stride + 1`.
///
/// Returns `None` when the stride is zero or the kernel does not fit.
///
/// # Examples
///
/// ```
/// use neural_layers::functions::convolution::conv_output_size;
///
/// assert_eq!(conv_output_size(28, 3, 1, 1, false), Some(28));
/// assert_eq!(conv_output_size(28, 4, 2, 0, false), Some(13));
/// assert_eq!(conv_output_size(28, 3, 2, 0, false), Some(13));
/// assert_eq!(conv_output_size(28, 3, 2, 0, true), Some(14));
/// ```
pub fn conv_output_size(
    size: usize,
    kernel: usize,
    stride: usize,
    padding: usize,
    cover_all: bool,
) -> Option<usize> {
    if stride == 0 || kernel == 0 {
        return None;
    }
    let padded = size + 2 * padding;
    let span = if cover_all {
        (padded + stride - 1).checked_sub(kernel)?
    } else {
        padded.checked_sub(kernel)?
    };
    Some(span / stride + 1)
}

/// Output length of a transposed convolution along one axis.
///
/// Inverse of [`conv_output_size`] for sizes where the forward division is exact:
/// `stride * (size - 1) + kernel - 2 * padding`, minus `stride - 1` with `cover_all`.
pub fn deconv_output_size(
    size: usize,
    kernel: usize,
    stride: usize,
    padding: usize,
    cover_all: bool,
) -> Option<usize> {
    if stride == 0 || kernel == 0 || size == 0 {
        return None;
    }
    let full = stride * (size - 1) + kernel;
    let full = if cover_all {
        (full + 1).checked_sub(stride)?
    } else {
        full
    };
    full.checked_sub(2 * padding).filter(|&n| n > 0)
}

/// Geometry of a 2D convolution: kernel, stride, padding and boundary policy.
///
/// All pairs are `(vertical, horizontal)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conv2dParams {
    pub kernel: (usize, usize),
    pub stride: (usize, usize),
    pub padding: (usize, usize),
    pub cover_all: bool,
}

impl Conv2dParams {
    /// Create a validated geometry. Kernel sizes and strides must be at least 1.
    pub fn new(
        kernel: (usize, usize),
        stride: (usize, usize),
        padding: (usize, usize),
        cover_all: bool,
    ) -> Result<Self> {
        if kernel.0 == 0 || kernel.1 == 0 {
            return Err(LayerError::InvalidConfig(format!(
                "kernel size must be greater than 0, got {:?}",
                kernel
            )));
        }
        if stride.0 == 0 || stride.1 == 0 {
            return Err(LayerError::InvalidConfig(format!(
                "stride must be greater than 0, got {:?}",
                stride
            )));
        }
        Ok(Self {
            kernel,
            stride,
            padding,
            cover_all,
        })
    }

    /// Square kernel, equal strides and equal padding on both axes.
    pub fn square(kernel: usize, stride: usize, padding: usize) -> Result<Self> {
        Self::new((kernel, kernel), (stride, stride), (padding, padding), false)
    }

    /// Spatial output size `(out_h, out_w)` for an input of `height × width`.
    pub fn output_size(&self, height: usize, width: usize) -> Result<(usize, usize)> {
        let out_h = conv_output_size(
            height,
            self.kernel.0,
            self.stride.0,
            self.padding.0,
            self.cover_all,
        );
        let out_w = conv_output_size(
            width,
            self.kernel.1,
            self.stride.1,
            self.padding.1,
            self.cover_all,
        );
        match (out_h, out_w) {
            (Some(h), Some(w)) => Ok((h, w)),
            _ => Err(LayerError::InvalidConfig(format!(
                "input {}x{} with padding {:?} is smaller than kernel {:?}",
                height, width, self.padding, self.kernel
            ))),
        }
    }

    /// Input row/column read by kernel offset `k` at output position `out`,
    /// or `None` when it falls in the zero padding.
    fn source_index(
        out: usize,
        k: usize,
        stride: usize,
        pad: usize,
        limit: usize,
    ) -> Option<usize> {
        (out * stride + k).checked_sub(pad).filter(|&i| i < limit)
    }
}

/// Unroll the receptive fields of one `[C, H, W]` image into `[C * kh * kw, oh * ow]`.
fn im2col(
    image: ArrayView3<f32>,
    params: &Conv2dParams,
    out_h: usize,
    out_w: usize,
) -> Array2<f32> {
    let (channels, height, width) = image.dim();
    let (kh, kw) = params.kernel;
    let (sy, sx) = params.stride;
    let (ph, pw) = params.padding;

    let mut col = Array2::<f32>::zeros((channels * kh * kw, out_h * out_w));
    for c in 0..channels {
        for ky in 0..kh {
            for kx in 0..kw {
                let row = (c * kh + ky) * kw + kx;
                for oy in 0..out_h {
                    let Some(iy) = Conv2dParams::source_index(oy, ky, sy, ph, height) else {
                        continue;
                    };
                    for ox in 0..out_w {
                        if let Some(ix) = Conv2dParams::source_index(ox, kx, sx, pw, width) {
                            col[[row, oy * out_w + ox]] = image[[c, iy, ix]];
                        }
                    }
                }
            }
        }
    }
    col
}

/// Scatter-add a patch matrix back onto a `[C, H, W]` image (adjoint of `im2col`).
fn col2im(
    col: ArrayView2<f32>,
    params: &Conv2dParams,
    out_h: usize,
    out_w: usize,
    mut image: ArrayViewMut3<f32>,
) {
    let (channels, height, width) = image.dim();
    let (kh, kw) = params.kernel;
    let (sy, sx) = params.stride;
    let (ph, pw) = params.padding;

    for c in 0..channels {
        for ky in 0..kh {
            for kx in 0..kw {
                let row = (c * kh + ky) * kw + kx;
                for oy in 0..out_h {
                    let Some(iy) = Conv2dParams::source_index(oy, ky, sy, ph, height) else {
                        continue;
                    };
                    for ox in 0..out_w {
                        if let Some(ix) = Conv2dParams::source_index(ox, kx, sx, pw, width) {
                            image[[c, iy, ix]] += col[[row, oy * out_w + ox]];
                        }
                    }
                }
            }
        }
    }
}

/// Flatten `[O, C, kh, kw]` filters into an `[O, C * kh * kw]` matrix.
fn filter_matrix(w: ArrayView4<f32>) -> Result<Array2<f32>> {
    let (out_channels, channels, kh, kw) = w.dim();
    Ok(Array2::from_shape_vec(
        (out_channels, channels * kh * kw),
        w.iter().cloned().collect(),
    )?)
}

/// Flatten one `[O, oh, ow]` feature map into an `[O, oh * ow]` matrix.
fn feature_matrix(map: ArrayView3<f32>) -> Result<Array2<f32>> {
    let (channels, h, w) = map.dim();
    Ok(Array2::from_shape_vec(
        (channels, h * w),
        map.iter().cloned().collect(),
    )?)
}

fn check_filters(w: &ArrayView4<f32>, channels: usize, params: &Conv2dParams) -> Result<()> {
    let (out_channels, w_channels, kh, kw) = w.dim();
    if w_channels != channels || (kh, kw) != params.kernel {
        return Err(LayerError::shape_mismatch(
            "convolution filters",
            [out_channels, channels, params.kernel.0, params.kernel.1],
            w.shape(),
        ));
    }
    Ok(())
}

/// Strided, zero-padded 2D convolution (cross-correlation).
///
/// # Arguments
///
/// * `x` - Input of shape `[batch, in_channels, height, width]`
/// * `w` - Filters of shape `[out_channels, in_channels, kh, kw]`
/// * `params` - Kernel, stride, padding and `cover_all` policy
///
/// # Returns
///
/// Output of shape `[batch, out_channels, out_h, out_w]`.
pub fn convolution_2d(x: &Tensor, w: &Tensor, params: &Conv2dParams) -> Result<Tensor> {
    let x = view_as::<Ix4>(x, "convolution input", "[batch, channels, height, width]")?;
    let w = view_as::<Ix4>(w, "convolution filters", "[out_channels, in_channels, kh, kw]")?;
    let (batch, channels, height, width) = x.dim();
    check_filters(&w, channels, params)?;

    let out_channels = w.dim().0;
    let (out_h, out_w) = params.output_size(height, width)?;
    let filters = filter_matrix(w)?;

    let mut y = Array4::<f32>::zeros((batch, out_channels, out_h, out_w));
    for (n, image) in x.outer_iter().enumerate() {
        let col = im2col(image, params, out_h, out_w);
        y.index_axis_mut(Axis(0), n)
            .into_shape((out_channels, out_h * out_w))?
            .assign(&filters.dot(&col));
    }
    Ok(y.into_dyn())
}

/// Transposed 2D convolution: the gradient of [`convolution_2d`] with respect to its input.
///
/// # Arguments
///
/// * `dy` - Gradient of shape `[batch, out_channels, out_h, out_w]`
/// * `w` - Filters of shape `[out_channels, in_channels, kh, kw]`
/// * `params` - The geometry used by the forward convolution
/// * `input_size` - Spatial size `(height, width)` of the forward input. When `None`
///   it is recovered with [`deconv_output_size`], which is ambiguous for strides
///   that did not divide the forward input evenly.
///
/// # Returns
///
/// Gradient of shape `[batch, in_channels, height, width]`.
pub fn deconvolution_2d(
    dy: &Tensor,
    w: &Tensor,
    params: &Conv2dParams,
    input_size: Option<(usize, usize)>,
) -> Result<Tensor> {
    let dy = view_as::<Ix4>(dy, "deconvolution gradient", "[batch, out_channels, out_h, out_w]")?;
    let w = view_as::<Ix4>(w, "deconvolution filters", "[out_channels, in_channels, kh, kw]")?;
    let (batch, out_channels, out_h, out_w) = dy.dim();
    let channels = w.dim().1;
    check_filters(&w, channels, params)?;
    if w.dim().0 != out_channels {
        return Err(LayerError::shape_mismatch(
            "deconvolution filters",
            [out_channels, channels, params.kernel.0, params.kernel.1],
            w.shape(),
        ));
    }

    let (height, width) = match input_size {
        Some(size) => size,
        None => {
            let rows = deconv_output_size(
                out_h,
                params.kernel.0,
                params.stride.0,
                params.padding.0,
                params.cover_all,
            );
            let cols = deconv_output_size(
                out_w,
                params.kernel.1,
                params.stride.1,
                params.padding.1,
                params.cover_all,
            );
            rows.zip(cols).ok_or_else(|| {
                LayerError::InvalidConfig(format!(
                    "cannot infer deconvolution output size from {}x{}",
                    out_h, out_w
                ))
            })?
        }
    };
    let (expected_h, expected_w) = params.output_size(height, width)?;
    if (expected_h, expected_w) != (out_h, out_w) {
        return Err(LayerError::shape_mismatch(
            "deconvolution gradient",
            [batch, out_channels, expected_h, expected_w],
            dy.shape(),
        ));
    }

    let filters = filter_matrix(w)?;
    let mut dx = Array4::<f32>::zeros((batch, channels, height, width));
    for (n, grad) in dy.outer_iter().enumerate() {
        let col = filters.t().dot(&feature_matrix(grad)?);
        col2im(col.view(), params, out_h, out_w, dx.index_axis_mut(Axis(0), n));
    }
    Ok(dx.into_dyn())
}

/// Gradient of [`convolution_2d`] with respect to its filters.
///
/// Correlates the forward input `x` with the output gradient `dy` under the same
/// geometry and sums over the batch.
///
/// # Returns
///
/// Filter gradient of shape `[out_channels, in_channels, kh, kw]`.
pub fn convolution_2d_grad(x: &Tensor, dy: &Tensor, params: &Conv2dParams) -> Result<Tensor> {
    let x = view_as::<Ix4>(x, "convolution input", "[batch, channels, height, width]")?;
    let dy = view_as::<Ix4>(dy, "convolution gradient", "[batch, out_channels, out_h, out_w]")?;
    let (batch, channels, height, width) = x.dim();
    let out_channels = dy.dim().1;
    let (out_h, out_w) = params.output_size(height, width)?;
    if dy.dim() != (batch, out_channels, out_h, out_w) {
        return Err(LayerError::shape_mismatch(
            "convolution gradient",
            [batch, out_channels, out_h, out_w],
            dy.shape(),
        ));
    }

    let (kh, kw) = params.kernel;
    let mut dw = Array2::<f32>::zeros((out_channels, channels * kh * kw));
    for (image, grad) in x.outer_iter().zip(dy.outer_iter()) {
        let col = im2col(image, params, out_h, out_w);
        dw += &feature_matrix(grad)?.dot(&col.t());
    }
    Ok(dw.into_shape((out_channels, channels, kh, kw))?.into_dyn())
}
