//! Facade crate for the `barscan-*` workspace.
//!
//! This crate provides:
//! - re-exports of the pixel, decode and scanner crates under short names
//! - (feature-gated) helpers that turn an `image::GrayImage` into camera
//!   frames and render what a decoder will see back into images
//!
//! ## Quickstart
//!
//! ```no_run
//! use std::sync::Arc;
//! use barscan::decode::{DefaultDecoderFactory, EngineHints, RecognitionEngine};
//! use barscan::scanner::{ControlLoop, ScanOptions, ScanOrchestrator};
//! # use barscan::scanner::{CameraProvider, ScanListener};
//! # fn engine(_: EngineHints) -> Box<dyn RecognitionEngine> { unimplemented!() }
//! # fn run(camera: Arc<dyn CameraProvider>, listener: Arc<dyn ScanListener>) {
//!
//! let control = ControlLoop::new();
//! let factory = DefaultDecoderFactory::new(engine);
//! let scanner = ScanOrchestrator::new(camera, Arc::new(factory), Arc::new(control.handle()));
//! scanner.start(ScanOptions::default(), listener).unwrap();
//! loop {
//!     control.pump_timeout(std::time::Duration::from_millis(16));
//! }
//! # }
//! ```
//!
//! ## API map
//! - `barscan::core`: pixel buffers, frame layouts, rotation and mirroring.
//! - `barscan::decode`: binarizers, the engine contract, decode strategies.
//! - `barscan::scanner`: camera contract, session orchestration, callbacks.
//! - `barscan::prepare` (feature `image`): frames from images and back.

pub use barscan_core as core;
pub use barscan_decode as decode;
pub use barscan_scanner as scanner;

pub use barscan_core::{CandidatePoint, FrameLayout, PixelBuffer, PixelError, Rotation};
pub use barscan_decode::{
    BarcodeFamily, BarcodeFormat, DecodeOptions, DecodeOutcome, DecodeStrategy, DecoderFactory,
    DefaultDecoderFactory, RecognitionEngine, StrategyKind,
};
pub use barscan_scanner::{
    ScanConfig, ScanListener, ScanMode, ScanOptions, ScanOrchestrator, ScanResult, ScanState,
};

#[cfg(feature = "image")]
pub mod prepare;
