//! Bridges between `image::GrayImage` and the pipeline's buffer types.
//!
//! [`prepare`] runs a still image through the same steps a camera frame
//! takes before it reaches a recognition engine, and hands back both the
//! oriented luminance and the final bitmap for inspection.

use ::image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};

use crate::core::{orient, FrameLayout, PixelBuffer, PixelError, Rotation};
use crate::decode::{
    BinaryBitmap, BinarizerKind, BitMatrix, DecodeOptions, DecoderFactory, DefaultDecoderFactory,
    EngineError, EngineHints, EngineResult, RecognitionEngine, StrategyKind,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(thiserror::Error, Debug)]
pub enum PrepareError {
    #[error(transparent)]
    Pixel(#[from] PixelError),
    #[error("at least one frame is required")]
    NoFrames,
}

/// Copy a grayscale image into a dense pixel buffer.
pub fn pixel_buffer(img: &GrayImage) -> Result<PixelBuffer, PixelError> {
    PixelBuffer::from_dense(
        img.as_raw().clone(),
        img.width() as usize,
        img.height() as usize,
    )
}

pub fn gray_image(buffer: &PixelBuffer) -> GrayImage {
    GrayImage::from_fn(buffer.width() as u32, buffer.height() as u32, |x, y| {
        Luma([buffer.get(x as usize, y as usize)])
    })
}

/// Render a bitmap with dark modules black and everything else white.
pub fn bitmap_image(matrix: &BitMatrix) -> GrayImage {
    GrayImage::from_fn(matrix.width() as u32, matrix.height() as u32, |x, y| {
        if matrix.get(x as usize, y as usize) {
            Luma([0])
        } else {
            Luma([255])
        }
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepareParams {
    pub rotation_degrees: i32,
    /// Treat the image as coming from a front (mirrored) camera.
    pub mirrored: bool,
    /// Applied after orientation.
    pub crop: Option<CropRect>,
    pub strategy: StrategyKind,
    pub binarizer: BinarizerKind,
    /// Consecutive `to_bitmap` calls; matters for the mixed strategy.
    pub frames: usize,
}

impl Default for PrepareParams {
    fn default() -> Self {
        Self {
            rotation_degrees: 0,
            mirrored: false,
            crop: None,
            strategy: StrategyKind::Normal,
            binarizer: BinarizerKind::Block,
            frames: 1,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Prepared {
    /// Oriented (and cropped) luminance, before any inversion.
    pub luminance: PixelBuffer,
    /// Bitmap produced by the last `to_bitmap` call.
    pub bitmap: BitMatrix,
}

/// Stand-in engine: `prepare` only needs the strategy's bitmap stage.
struct NoEngine;

impl RecognitionEngine for NoEngine {
    fn decode(&mut self, _bitmap: &BinaryBitmap<'_>) -> Result<EngineResult, EngineError> {
        Err(EngineError::NotFound)
    }

    fn reset(&mut self) {}
}

#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(img), fields(width = img.width(), height = img.height()))
)]
pub fn prepare(img: &GrayImage, params: &PrepareParams) -> Result<Prepared, PrepareError> {
    if params.frames == 0 {
        return Err(PrepareError::NoFrames);
    }
    let layout = FrameLayout::dense(img.width() as usize, img.height() as usize);
    let rotation = Rotation::from_degrees(params.rotation_degrees)?;
    let mut luminance = orient(img.as_raw().clone(), layout, rotation, params.mirrored)?;
    if let Some(c) = params.crop {
        luminance = luminance.crop(c.x, c.y, c.width, c.height)?;
    }

    let factory =
        DefaultDecoderFactory::new(|_: EngineHints| Box::new(NoEngine) as Box<dyn RecognitionEngine>);
    let options = DecodeOptions {
        strategy: params.strategy,
        binarizer: params.binarizer,
        ..DecodeOptions::default()
    };
    let mut strategy = factory.create_decoder(&options);

    let mut bitmap = strategy.to_bitmap(&luminance).matrix().clone();
    for _ in 1..params.frames {
        bitmap = strategy.to_bitmap(&luminance).matrix().clone();
    }
    log::debug!(
        "prepared {}x{} frame, {:?} x{}: {} dark modules",
        luminance.width(),
        luminance.height(),
        params.strategy,
        params.frames,
        bitmap.count_dark()
    );
    Ok(Prepared { luminance, bitmap })
}
