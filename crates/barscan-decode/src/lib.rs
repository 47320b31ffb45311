//! Turning oriented luminance frames into decoded symbols.
//!
//! The symbology work itself is done by a pluggable [`RecognitionEngine`].
//! This crate owns what happens around it: thresholding in the right
//! polarity, collecting the candidate points the engine reports, resetting
//! the engine after every attempt and filtering result metadata.
//!
//! ```
//! use barscan_decode::{
//!     BarcodeFormat, BinaryBitmap, DecodeOptions, DecoderFactory, DefaultDecoderFactory,
//!     EngineError, EngineHints, EngineResult, RecognitionEngine, StrategyKind,
//! };
//! use barscan_core::PixelBuffer;
//!
//! struct AlwaysQr;
//!
//! impl RecognitionEngine for AlwaysQr {
//!     fn decode(&mut self, _: &BinaryBitmap<'_>) -> Result<EngineResult, EngineError> {
//!         Ok(EngineResult::new("hello", BarcodeFormat::QrCode))
//!     }
//!     fn reset(&mut self) {}
//! }
//!
//! let factory = DefaultDecoderFactory::new(|_hints: EngineHints| {
//!     Box::new(AlwaysQr) as Box<dyn RecognitionEngine>
//! });
//! let options = DecodeOptions::default().with_strategy(StrategyKind::Mixed);
//! let mut decoder = factory.create_decoder(&options);
//!
//! let frame = PixelBuffer::from_dense(vec![0, 255, 255, 0], 2, 2).unwrap();
//! let decoded = decoder.decode(&frame).decoded().unwrap();
//! assert_eq!(decoded.text, "hello");
//! ```

mod binarize;
mod engine;
mod factory;
mod format;
mod metadata;
mod strategy;

pub use binarize::{
    BinaryBitmap, Binarizer, BinarizerKind, BitMatrix, BlockBinarizer, GlobalBinarizer,
};
pub use engine::{
    EngineBuilder, EngineError, EngineHints, EngineResult, PointCollector, RecognitionEngine,
};
pub use factory::{DecodeOptions, DecoderFactory, DefaultDecoderFactory};
pub use format::{BarcodeFamily, BarcodeFormat, UnknownFormat};
pub use metadata::{Metadata, MetadataKey, MetadataValue};
pub use strategy::{
    DecodeOutcome, DecodeStrategy, Decoded, EngineStrategy, Inverted, InvertedStrategy, Mixed,
    MixedStrategy, Normal, NormalStrategy, Polarity, StrategyCore, StrategyKind,
};
