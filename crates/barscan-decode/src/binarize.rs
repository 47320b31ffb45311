//! Luminance to 1-bit conversion.
//!
//! Two binarizers are provided. `GlobalBinarizer` picks one Otsu threshold for
//! the whole frame, which is fast and fine for evenly lit symbols.
//! `BlockBinarizer` thresholds fixed-size tiles independently and falls back
//! to the global threshold in flat tiles; it copes with the gradients a phone
//! torch or a glossy label produces, and is the default.

use std::borrow::Cow;

use barscan_core::{PixelBuffer, PixelView};
use serde::{Deserialize, Serialize};

/// Packed 1-bit image. A set bit is a dark module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitMatrix {
    width: usize,
    height: usize,
    row_words: usize,
    bits: Vec<u32>,
}

impl BitMatrix {
    pub fn new(width: usize, height: usize) -> Self {
        let row_words = width.div_ceil(32);
        Self {
            width,
            height,
            row_words,
            bits: vec![0; row_words * height],
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
    pub fn get(&self, x: usize, y: usize) -> bool {
        debug_assert!(x < self.width && y < self.height);
        let word = self.bits[y * self.row_words + x / 32];
        (word >> (x % 32)) & 1 != 0
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize) {
        debug_assert!(x < self.width && y < self.height);
        self.bits[y * self.row_words + x / 32] |= 1 << (x % 32);
    }

    pub fn count_dark(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }
}

/// A thresholded frame handed to a recognition engine.
///
/// The luminance the matrix was derived from travels along so engines that
/// re-threshold (e.g. on a try-harder pass) see the same polarity.
#[derive(Clone, Debug)]
pub struct BinaryBitmap<'a> {
    matrix: BitMatrix,
    luminance: Cow<'a, PixelBuffer>,
}

impl<'a> BinaryBitmap<'a> {
    pub fn new(matrix: BitMatrix, luminance: Cow<'a, PixelBuffer>) -> Self {
        Self { matrix, luminance }
    }

    pub fn width(&self) -> usize {
        self.matrix.width
    }

    pub fn height(&self) -> usize {
        self.matrix.height
    }

    pub fn matrix(&self) -> &BitMatrix {
        &self.matrix
    }

    pub fn luminance(&self) -> &PixelBuffer {
        &self.luminance
    }
}

pub trait Binarizer: Send {
    fn threshold(&self, luminance: &PixelView<'_>) -> BitMatrix;
}

/// Which binarizer a decoder should use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinarizerKind {
    Global,
    #[default]
    Block,
}

impl BinarizerKind {
    pub fn build(self) -> Box<dyn Binarizer> {
        match self {
            Self::Global => Box::new(GlobalBinarizer),
            Self::Block => Box::new(BlockBinarizer::default()),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct GlobalBinarizer;

impl Binarizer for GlobalBinarizer {
    fn threshold(&self, luminance: &PixelView<'_>) -> BitMatrix {
        let (w, h) = (luminance.width(), luminance.height());
        let mut out = BitMatrix::new(w, h);
        let Some(t) = otsu_threshold(&histogram(luminance, 0, 0, w, h)) else {
            return out;
        };
        fill_below(&mut out, luminance, t, 0, 0, w, h);
        out
    }
}

#[derive(Clone, Copy, Debug)]
pub struct BlockBinarizer {
    /// Tile edge in pixels.
    pub tile: usize,
    /// Tiles whose max-min spread is below this use the global threshold.
    pub min_contrast: u8,
}

impl Default for BlockBinarizer {
    fn default() -> Self {
        Self {
            tile: 32,
            min_contrast: 24,
        }
    }
}

impl Binarizer for BlockBinarizer {
    fn threshold(&self, luminance: &PixelView<'_>) -> BitMatrix {
        let (w, h) = (luminance.width(), luminance.height());
        let mut out = BitMatrix::new(w, h);
        let global = otsu_threshold(&histogram(luminance, 0, 0, w, h));
        let tile = self.tile.max(8);

        for y0 in (0..h).step_by(tile) {
            let th = tile.min(h - y0);
            for x0 in (0..w).step_by(tile) {
                let tw = tile.min(w - x0);
                let hist = histogram(luminance, x0, y0, tw, th);
                let local = match spread(&hist) {
                    Some((lo, hi)) if hi - lo >= self.min_contrast => otsu_threshold(&hist),
                    _ => global,
                };
                if let Some(t) = local {
                    fill_below(&mut out, luminance, t, x0, y0, tw, th);
                }
            }
        }
        out
    }
}

fn histogram(img: &PixelView<'_>, x0: usize, y0: usize, w: usize, h: usize) -> [u32; 256] {
    let mut hist = [0u32; 256];
    for y in y0..y0 + h {
        for &v in &img.row(y)[x0..x0 + w] {
            hist[v as usize] += 1;
        }
    }
    hist
}

fn spread(hist: &[u32; 256]) -> Option<(u8, u8)> {
    let lo = hist.iter().position(|&c| c > 0)?;
    let hi = hist.iter().rposition(|&c| c > 0)?;
    Some((lo as u8, hi as u8))
}

fn fill_below(
    out: &mut BitMatrix,
    img: &PixelView<'_>,
    threshold: u8,
    x0: usize,
    y0: usize,
    w: usize,
    h: usize,
) {
    for y in y0..y0 + h {
        let row = img.row(y);
        for x in x0..x0 + w {
            if row[x] < threshold {
                out.set(x, y);
            }
        }
    }
}

/// Otsu's threshold over a histogram.
///
/// Returns the smallest light value: pixels strictly below it are dark.
/// `None` means the region is flat and has no meaningful split.
pub(crate) fn otsu_threshold(hist: &[u32; 256]) -> Option<u8> {
    let (min_v, max_v) = spread(hist)?;
    if min_v == max_v {
        return None;
    }

    let nonzero_bins = hist.iter().filter(|&&c| c > 0).count();
    if nonzero_bins <= 2 {
        return Some(((min_v as u16 + max_v as u16) / 2 + 1) as u8);
    }

    let total: f64 = hist.iter().map(|&c| c as f64).sum();
    let sum_total: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &c)| i as f64 * c as f64)
        .sum();

    let mut sum_b = 0f64;
    let mut w_b = 0f64;
    let mut best_var = -1f64;
    let mut best_t = min_v;

    for (t, &c) in hist.iter().enumerate().take(max_v as usize) {
        w_b += c as f64;
        if w_b == 0.0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f == 0.0 {
            break;
        }
        sum_b += t as f64 * c as f64;
        let m_b = sum_b / w_b;
        let m_f = (sum_total - sum_b) / w_f;
        let between = w_b * w_f * (m_b - m_f) * (m_b - m_f);
        if between > best_var {
            best_var = between;
            best_t = t as u8;
        }
    }

    // best_t < max_v, so this cannot overflow.
    Some(best_t + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(data: &[u8], width: usize, height: usize) -> PixelView<'_> {
        PixelView::new(data, width, height).expect("dense test plane")
    }

    #[test]
    fn bit_matrix_set_get_across_word_boundary() {
        let mut m = BitMatrix::new(40, 2);
        m.set(31, 0);
        m.set(32, 1);
        assert!(m.get(31, 0));
        assert!(!m.get(32, 0));
        assert!(m.get(32, 1));
        assert_eq!(m.count_dark(), 2);
    }

    #[test]
    fn otsu_splits_bimodal_histogram() {
        let mut hist = [0u32; 256];
        hist[20] = 50;
        hist[25] = 50;
        hist[200] = 50;
        hist[210] = 50;
        let t = otsu_threshold(&hist).unwrap();
        assert!(t > 25 && t <= 200, "threshold {t}");
    }

    #[test]
    fn otsu_on_flat_region_is_none() {
        let mut hist = [0u32; 256];
        hist[90] = 10;
        assert_eq!(otsu_threshold(&hist), None);
        assert_eq!(otsu_threshold(&[0; 256]), None);
    }

    #[test]
    fn two_level_image_splits_at_midpoint() {
        let mut hist = [0u32; 256];
        hist[0] = 3;
        hist[255] = 3;
        assert_eq!(otsu_threshold(&hist), Some(128));
    }

    #[test]
    fn global_binarizer_marks_dark_pixels() {
        let data = [0, 255, 0, 255, 255, 0];
        let m = GlobalBinarizer.threshold(&view(&data, 3, 2));
        assert!(m.get(0, 0));
        assert!(!m.get(1, 0));
        assert!(m.get(2, 0));
        assert!(!m.get(0, 1));
        assert!(m.get(2, 1));
    }

    #[test]
    fn flat_frame_is_all_light() {
        let data = vec![7u8; 64 * 64];
        assert_eq!(GlobalBinarizer.threshold(&view(&data, 64, 64)).count_dark(), 0);
        assert_eq!(
            BlockBinarizer::default()
                .threshold(&view(&data, 64, 64))
                .count_dark(),
            0
        );
    }

    #[test]
    fn block_binarizer_follows_illumination_gradient() {
        // Left half is a dim checkerboard, right half a bright one. A single
        // global threshold lands between the two halves and flattens both.
        let (w, h) = (64, 32);
        let mut data = vec![0u8; w * h];
        for y in 0..h {
            for x in 0..w {
                let dark = ((x / 4) + (y / 4)) % 2 == 0;
                data[y * w + x] = match (x < 32, dark) {
                    (true, true) => 10,
                    (true, false) => 60,
                    (false, true) => 180,
                    (false, false) => 240,
                };
            }
        }
        let img = view(&data, w, h);
        let block = BlockBinarizer::default().threshold(&img);
        assert!(block.get(0, 0));
        assert!(!block.get(4, 0));
        assert!(block.get(32, 0));
        assert!(!block.get(36, 0));

        let global = GlobalBinarizer.threshold(&img);
        assert!(global.get(4, 0));
        assert!(!global.get(32, 0));
    }
}
