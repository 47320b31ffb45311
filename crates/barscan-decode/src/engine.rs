//! Contract with the pluggable recognition engine.
//!
//! The engine does the symbology work: locate, sample, error-correct. This
//! crate only feeds it thresholded frames and collects what it reports.

use std::collections::BTreeSet;
use std::sync::Arc;

use barscan_core::CandidatePoint;
use parking_lot::Mutex;

use crate::{BarcodeFormat, BinaryBitmap, MetadataKey, MetadataValue};

/// Raw result of a successful engine call.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineResult {
    pub text: String,
    pub format: BarcodeFormat,
    pub metadata: Vec<(MetadataKey, MetadataValue)>,
}

impl EngineResult {
    pub fn new(text: impl Into<String>, format: BarcodeFormat) -> Self {
        Self {
            text: text.into(),
            format,
            metadata: Vec::new(),
        }
    }

    pub fn with_metadata(mut self, key: MetadataKey, value: MetadataValue) -> Self {
        self.metadata.push((key, value));
        self
    }
}

/// Ways an engine call can fail. All of them mean "no symbol this frame".
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("no symbol found")]
    NotFound,
    #[error("symbol checksum mismatch")]
    Checksum,
    #[error("symbol format error")]
    Format,
    #[error("{0}")]
    Other(String),
}

/// Receives candidate points while the engine searches a frame.
///
/// Cloned into the engine's hints; the owning decoder reads and clears the
/// same list. Only the decoding thread touches it.
#[derive(Clone, Debug, Default)]
pub struct PointCollector {
    points: Arc<Mutex<Vec<CandidatePoint>>>,
}

impl PointCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called by the engine for every point of interest.
    pub fn found(&self, point: CandidatePoint) {
        self.points.lock().push(point);
    }

    pub fn clear(&self) {
        self.points.lock().clear();
    }

    pub fn snapshot(&self) -> Vec<CandidatePoint> {
        self.points.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.points.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Configuration handed to an engine when it is built.
#[derive(Clone, Debug, Default)]
pub struct EngineHints {
    /// `None` lets the engine try every format it knows.
    pub possible_formats: Option<BTreeSet<BarcodeFormat>>,
    pub try_harder: bool,
    /// Ask the engine to also try the inverse of each bitmap internally.
    pub also_inverted: bool,
    pub point_callback: Option<PointCollector>,
}

pub trait RecognitionEngine: Send {
    fn decode(&mut self, bitmap: &BinaryBitmap<'_>) -> Result<EngineResult, EngineError>;

    /// Drop any per-frame state. Called after every decode attempt.
    fn reset(&mut self);
}

/// Builds a configured engine for each new decoder.
pub trait EngineBuilder: Send + Sync {
    fn build(&self, hints: EngineHints) -> Box<dyn RecognitionEngine>;
}

impl<F> EngineBuilder for F
where
    F: Fn(EngineHints) -> Box<dyn RecognitionEngine> + Send + Sync,
{
    fn build(&self, hints: EngineHints) -> Box<dyn RecognitionEngine> {
        self(hints)
    }
}
