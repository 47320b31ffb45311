//! Core types for live barcode scanning.
//!
//! This crate is intentionally small and purely about pixels. It does *not*
//! depend on any recognition engine or camera backend: it turns raw camera
//! luminance planes into dense buffers, fixes their orientation, and carries
//! the candidate points engines report back.

mod error;
mod geometry;
mod image;
mod logger;
mod point;

pub use error::PixelError;
pub use geometry::{orient, FrameLayout, Rotation};
pub use image::{PixelBuffer, PixelView};
pub use point::{mirror_x, CandidatePoint};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
