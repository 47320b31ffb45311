//! Frame normalization and orientation.
//!
//! Camera sensors deliver planes that are strided, interleaved and rotated
//! (or mirrored) relative to the viewfinder. Everything here works on the
//! luminance channel only.

use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{PixelBuffer, PixelError};

/// Memory layout of a raw luminance plane as delivered by a camera.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameLayout {
    pub width: usize,
    pub height: usize,
    /// Distance in bytes between the starts of two consecutive rows.
    pub row_stride: usize,
    /// Distance in bytes between two consecutive samples of one row.
    pub pixel_stride: usize,
}

impl FrameLayout {
    /// Layout of an already dense plane.
    pub fn dense(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            row_stride: width,
            pixel_stride: 1,
        }
    }

    #[inline]
    pub fn is_dense(&self) -> bool {
        self.row_stride == self.width && self.pixel_stride == 1
    }

    fn validate(&self, got: usize) -> Result<(), PixelError> {
        let (width, height) = (self.width, self.height);
        if width == 0 || height == 0 {
            return Err(PixelError::InvalidDimensions { width, height });
        }
        let row_span = (width - 1)
            .checked_mul(self.pixel_stride)
            .and_then(|s| s.checked_add(1))
            .filter(|&s| self.pixel_stride > 0 && s <= self.row_stride)
            .ok_or(PixelError::InvalidStride {
                width,
                row_stride: self.row_stride,
                pixel_stride: self.pixel_stride,
            })?;
        // The last row may come without its trailing padding.
        let expected = (height - 1)
            .checked_mul(self.row_stride)
            .and_then(|n| n.checked_add(row_span))
            .ok_or(PixelError::InvalidDimensions { width, height })?;
        if got < expected {
            return Err(PixelError::ShortBuffer { expected, got });
        }
        Ok(())
    }
}

/// Quarter-turn rotation, clockwise.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Accepts exactly 0, 90, 180 and 270.
    pub fn from_degrees(degrees: i32) -> Result<Self, PixelError> {
        match degrees {
            0 => Ok(Self::Deg0),
            90 => Ok(Self::Deg90),
            180 => Ok(Self::Deg180),
            270 => Ok(Self::Deg270),
            other => Err(PixelError::UnsupportedRotation(other)),
        }
    }

    pub fn degrees(self) -> i32 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    /// Whether the rotation swaps width and height.
    #[inline]
    pub fn swaps_axes(self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }
}

impl PixelBuffer {
    /// Strip row padding and sample interleaving from a raw luminance plane.
    ///
    /// Dense layouts keep the input allocation; any trailing bytes (chroma
    /// planes packed after the luminance) are truncated without copying.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "trace", skip(raw), fields(len = raw.len()))
    )]
    pub fn normalize(mut raw: Vec<u8>, layout: FrameLayout) -> Result<PixelBuffer, PixelError> {
        if layout.is_dense() {
            let expected = layout
                .width
                .checked_mul(layout.height)
                .filter(|&n| n > 0)
                .ok_or(PixelError::InvalidDimensions {
                    width: layout.width,
                    height: layout.height,
                })?;
            if raw.len() < expected {
                return Err(PixelError::ShortBuffer {
                    expected,
                    got: raw.len(),
                });
            }
            raw.truncate(expected);
            return Ok(PixelBuffer::from_parts(raw, layout.width, layout.height));
        }

        layout.validate(raw.len())?;
        let FrameLayout {
            width,
            height,
            row_stride,
            pixel_stride,
        } = layout;

        let mut out = Vec::with_capacity(width * height);
        for y in 0..height {
            let row = &raw[y * row_stride..];
            out.extend(row.iter().step_by(pixel_stride).take(width));
        }
        Ok(PixelBuffer::from_parts(out, width, height))
    }

    /// Mirror every row around the vertical axis.
    pub fn flip_horizontal(&self) -> PixelBuffer {
        let w = self.width();
        let mut out = Vec::with_capacity(self.data().len());
        for row in self.data().chunks_exact(w) {
            out.extend(row.iter().rev());
        }
        PixelBuffer::from_parts(out, w, self.height())
    }

    /// Mirror around the horizontal axis and the vertical axis at once.
    ///
    /// Reversing the whole dense buffer is the same as a half turn.
    pub fn flip_vertical(&self) -> PixelBuffer {
        let out = self.data().iter().rev().copied().collect();
        PixelBuffer::from_parts(out, self.width(), self.height())
    }

    /// Rotate clockwise by a quarter-turn multiple.
    pub fn rotate(self, rotation: Rotation) -> PixelBuffer {
        match rotation {
            Rotation::Deg0 => self,
            Rotation::Deg90 => self.rotate_clockwise(),
            Rotation::Deg180 => self.flip_vertical(),
            Rotation::Deg270 => self.rotate_counter_clockwise(),
        }
    }

    /// Column-major walk from the bottom row up: output row `x` is source column `x`.
    fn rotate_clockwise(&self) -> PixelBuffer {
        let (w, h) = (self.width(), self.height());
        let src = self.data();
        let mut out = Vec::with_capacity(src.len());
        for x in 0..w {
            for y in (0..h).rev() {
                out.push(src[y * w + x]);
            }
        }
        PixelBuffer::from_parts(out, h, w)
    }

    /// Same walk as the clockwise case, written back to front.
    fn rotate_counter_clockwise(&self) -> PixelBuffer {
        let (w, h) = (self.width(), self.height());
        let src = self.data();
        let mut out = vec![0u8; src.len()];
        let mut dst = src.len();
        for x in 0..w {
            for y in (0..h).rev() {
                dst -= 1;
                out[dst] = src[y * w + x];
            }
        }
        PixelBuffer::from_parts(out, h, w)
    }
}

/// Normalize a raw plane, undo sensor mirroring, then apply the frame rotation.
pub fn orient(
    raw: Vec<u8>,
    layout: FrameLayout,
    rotation: Rotation,
    mirrored: bool,
) -> Result<PixelBuffer, PixelError> {
    let buffer = PixelBuffer::normalize(raw, layout)?;
    let buffer = if mirrored {
        buffer.flip_horizontal()
    } else {
        buffer
    };
    Ok(buffer.rotate(rotation))
}
