use crate::PixelError;

/// Borrowed dense luminance plane; `data.len() == width * height`.
#[derive(Clone, Copy, Debug)]
pub struct PixelView<'a> {
    width: usize,
    height: usize,
    data: &'a [u8],
}

impl<'a> PixelView<'a> {
    /// Borrow an already dense plane.
    pub fn new(data: &'a [u8], width: usize, height: usize) -> Result<Self, PixelError> {
        let expected = dense_len(width, height)?;
        if data.len() != expected {
            return Err(PixelError::ShortBuffer {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    /// One row of samples.
    #[inline]
    pub fn row(&self, y: usize) -> &'a [u8] {
        let start = y * self.width;
        &self.data[start..start + self.width]
    }
}

fn dense_len(width: usize, height: usize) -> Result<usize, PixelError> {
    width
        .checked_mul(height)
        .filter(|&n| n > 0)
        .ok_or(PixelError::InvalidDimensions { width, height })
}

/// Owned dense luminance plane.
///
/// Built by [`PixelBuffer::normalize`] or [`PixelBuffer::from_dense`]; after
/// construction `data.len() == width * height` always holds. Geometry
/// operations never mutate a buffer in place, they return a new one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap an already dense plane.
    pub fn from_dense(data: Vec<u8>, width: usize, height: usize) -> Result<Self, PixelError> {
        let expected = dense_len(width, height)?;
        if data.len() != expected {
            return Err(PixelError::ShortBuffer {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Internal constructor for buffers produced by our own walks.
    #[inline]
    pub(crate) fn from_parts(data: Vec<u8>, width: usize, height: usize) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self {
            width,
            height,
            data,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn view(&self) -> PixelView<'_> {
        PixelView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    /// Photometric inverse (`255 - v` per sample), for light-on-dark codes.
    pub fn inverted(&self) -> PixelBuffer {
        let data = self.data.iter().map(|&v| 255 - v).collect();
        Self::from_parts(data, self.width, self.height)
    }

    /// Copy out a rectangular region.
    pub fn crop(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> Result<PixelBuffer, PixelError> {
        let fits = width > 0
            && height > 0
            && x.checked_add(width).is_some_and(|r| r <= self.width)
            && y.checked_add(height).is_some_and(|b| b <= self.height);
        if !fits {
            return Err(PixelError::CropOutOfBounds {
                x,
                y,
                width,
                height,
                frame_width: self.width,
                frame_height: self.height,
            });
        }

        let mut out = Vec::with_capacity(width * height);
        for row in y..y + height {
            let start = row * self.width + x;
            out.extend_from_slice(&self.data[start..start + width]);
        }
        Ok(Self::from_parts(out, width, height))
    }
}
