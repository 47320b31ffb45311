//! Decode strategies: how a luminance buffer becomes a bitmap for the engine.
//!
//! All strategies share the same decode routine and differ only in the
//! polarity of the bitmap they build. Dark-on-light codes want `Normal`,
//! light-on-dark codes want `Inverted`, and `Mixed` alternates between the
//! two on successive frames when the scene may contain either.

use std::borrow::Cow;

use barscan_core::{CandidatePoint, PixelBuffer};
use log::trace;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    BarcodeFormat, BinaryBitmap, Binarizer, EngineResult, Metadata, PointCollector,
    RecognitionEngine,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    Normal,
    Inverted,
    Mixed,
}

/// A decoded symbol.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decoded {
    pub text: String,
    pub format: BarcodeFormat,
    pub metadata: Metadata,
}

impl Decoded {
    fn from_engine(result: EngineResult) -> Self {
        Self {
            text: result.text,
            format: result.format,
            metadata: Metadata::from_engine(result.metadata),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecodeOutcome {
    Decoded(Decoded),
    NotFound,
}

impl DecodeOutcome {
    pub fn decoded(self) -> Option<Decoded> {
        match self {
            Self::Decoded(d) => Some(d),
            Self::NotFound => None,
        }
    }
}

/// Turns one oriented frame into at most one decoded symbol.
///
/// A strategy instance is owned by a single decoding thread and is not
/// shared; it is `Send` so it can be moved onto that thread.
pub trait DecodeStrategy: Send {
    fn kind(&self) -> StrategyKind;

    /// Threshold `buffer` in this strategy's polarity.
    ///
    /// Stateful for [`MixedStrategy`]: each call advances the alternation.
    fn to_bitmap<'a>(&mut self, buffer: &'a PixelBuffer) -> BinaryBitmap<'a>;

    /// Engine failures of any kind come back as [`DecodeOutcome::NotFound`].
    fn decode(&mut self, buffer: &PixelBuffer) -> DecodeOutcome;

    /// Points reported during the most recent `decode`, in buffer coordinates.
    fn possible_result_points(&self) -> Vec<CandidatePoint>;
}

/// Engine, binarizer and point list shared by every strategy variant.
pub struct StrategyCore {
    engine: Box<dyn RecognitionEngine>,
    binarizer: Box<dyn Binarizer>,
    points: PointCollector,
}

impl StrategyCore {
    /// `points` must be the collector the engine was built with.
    pub fn new(
        engine: Box<dyn RecognitionEngine>,
        binarizer: Box<dyn Binarizer>,
        points: PointCollector,
    ) -> Self {
        Self {
            engine,
            binarizer,
            points,
        }
    }

    fn bitmap<'a>(&self, buffer: &'a PixelBuffer, inverted: bool) -> BinaryBitmap<'a> {
        let luminance = if inverted {
            Cow::Owned(buffer.inverted())
        } else {
            Cow::Borrowed(buffer)
        };
        let matrix = self.binarizer.threshold(&luminance.view());
        BinaryBitmap::new(matrix, luminance)
    }

    fn run(&mut self, bitmap: &BinaryBitmap<'_>) -> DecodeOutcome {
        let attempt = {
            let mut guard = ResetOnDrop(&mut self.engine);
            guard.0.decode(bitmap)
        };
        match attempt {
            Ok(result) => DecodeOutcome::Decoded(Decoded::from_engine(result)),
            Err(err) => {
                trace!("no symbol: {err}");
                DecodeOutcome::NotFound
            }
        }
    }
}

/// Resets the engine when dropped, including while unwinding.
struct ResetOnDrop<'a>(&'a mut Box<dyn RecognitionEngine>);

impl Drop for ResetOnDrop<'_> {
    fn drop(&mut self) {
        self.0.reset();
    }
}

/// Chooses the polarity of each successive bitmap.
pub trait Polarity: Send + Default {
    const KIND: StrategyKind;

    fn next_inverted(&mut self) -> bool;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Normal;

impl Polarity for Normal {
    const KIND: StrategyKind = StrategyKind::Normal;

    fn next_inverted(&mut self) -> bool {
        false
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Inverted;

impl Polarity for Inverted {
    const KIND: StrategyKind = StrategyKind::Inverted;

    fn next_inverted(&mut self) -> bool {
        true
    }
}

/// Alternates polarity on every call, starting with normal.
#[derive(Clone, Copy, Debug)]
pub struct Mixed {
    inverted: bool,
}

impl Default for Mixed {
    fn default() -> Self {
        // Toggled before first use.
        Self { inverted: true }
    }
}

impl Polarity for Mixed {
    const KIND: StrategyKind = StrategyKind::Mixed;

    fn next_inverted(&mut self) -> bool {
        self.inverted = !self.inverted;
        self.inverted
    }
}

/// The engine-backed strategy, parameterized by polarity.
pub struct EngineStrategy<P: Polarity> {
    core: StrategyCore,
    polarity: P,
}

pub type NormalStrategy = EngineStrategy<Normal>;
pub type InvertedStrategy = EngineStrategy<Inverted>;
pub type MixedStrategy = EngineStrategy<Mixed>;

impl<P: Polarity> EngineStrategy<P> {
    pub fn new(core: StrategyCore) -> Self {
        Self {
            core,
            polarity: P::default(),
        }
    }
}

impl<P: Polarity> DecodeStrategy for EngineStrategy<P> {
    fn kind(&self) -> StrategyKind {
        P::KIND
    }

    fn to_bitmap<'a>(&mut self, buffer: &'a PixelBuffer) -> BinaryBitmap<'a> {
        let inverted = self.polarity.next_inverted();
        self.core.bitmap(buffer, inverted)
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "debug",
            skip_all,
            fields(kind = ?P::KIND, w = buffer.width(), h = buffer.height())
        )
    )]
    fn decode(&mut self, buffer: &PixelBuffer) -> DecodeOutcome {
        self.core.points.clear();
        let bitmap = self.to_bitmap(buffer);
        self.core.run(&bitmap)
    }

    fn possible_result_points(&self) -> Vec<CandidatePoint> {
        self.core.points.snapshot()
    }
}
