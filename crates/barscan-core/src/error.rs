/// Errors produced while normalizing or reshaping luminance buffers.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PixelError {
    #[error("invalid frame dimensions (width={width}, height={height})")]
    InvalidDimensions { width: usize, height: usize },

    #[error("invalid strides for width {width} (row_stride={row_stride}, pixel_stride={pixel_stride})")]
    InvalidStride {
        width: usize,
        row_stride: usize,
        pixel_stride: usize,
    },

    #[error("frame buffer too short (expected at least {expected} bytes, got {got})")]
    ShortBuffer { expected: usize, got: usize },

    #[error("unsupported rotation of {0} degrees (expected 0, 90, 180 or 270)")]
    UnsupportedRotation(i32),

    #[error("crop {width}x{height}+{x}+{y} is outside the {frame_width}x{frame_height} buffer")]
    CropOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        frame_width: usize,
        frame_height: usize,
    },
}
