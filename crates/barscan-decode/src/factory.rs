use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
    BarcodeFamily, BarcodeFormat, BinarizerKind, DecodeStrategy, EngineBuilder, EngineHints,
    InvertedStrategy, MixedStrategy, NormalStrategy, PointCollector, StrategyCore, StrategyKind,
};

/// Decoder configuration, fixed for the lifetime of a scan session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// Allow-list of symbologies; `None` or empty tries all of them.
    pub possible_formats: Option<BTreeSet<BarcodeFormat>>,
    /// Spend more time per frame for better recall.
    pub try_harder: bool,
    /// Let the engine also try the inverse bitmap on its own.
    pub also_inverted: bool,
    pub strategy: StrategyKind,
    pub binarizer: BinarizerKind,
}

impl DecodeOptions {
    /// Add every format of `family` to the allow-list.
    pub fn with_family(self, family: BarcodeFamily) -> Self {
        self.with_formats(family.formats())
    }

    pub fn with_formats(mut self, formats: impl IntoIterator<Item = BarcodeFormat>) -> Self {
        self.possible_formats
            .get_or_insert_with(BTreeSet::new)
            .extend(formats);
        self
    }

    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    /// Engine hints for these options, wired to `points`.
    pub fn hints(&self, points: PointCollector) -> EngineHints {
        EngineHints {
            possible_formats: self.possible_formats.clone().filter(|f| !f.is_empty()),
            try_harder: self.try_harder,
            also_inverted: self.also_inverted,
            point_callback: Some(points),
        }
    }
}

/// Produces a configured decoder per scan session.
pub trait DecoderFactory: Send + Sync {
    fn create_decoder(&self, options: &DecodeOptions) -> Box<dyn DecodeStrategy>;
}

/// Builds engine-backed strategies from an [`EngineBuilder`].
pub struct DefaultDecoderFactory<B> {
    builder: B,
}

impl<B: EngineBuilder> DefaultDecoderFactory<B> {
    pub fn new(builder: B) -> Self {
        Self { builder }
    }
}

impl<B: EngineBuilder> DecoderFactory for DefaultDecoderFactory<B> {
    fn create_decoder(&self, options: &DecodeOptions) -> Box<dyn DecodeStrategy> {
        let points = PointCollector::new();
        let engine = self.builder.build(options.hints(points.clone()));
        let core = StrategyCore::new(engine, options.binarizer.build(), points);
        log::debug!(
            "decoder: {:?}/{:?}, formats={:?}, try_harder={}, also_inverted={}",
            options.strategy,
            options.binarizer,
            options.possible_formats,
            options.try_harder,
            options.also_inverted
        );
        match options.strategy {
            StrategyKind::Normal => Box::new(NormalStrategy::new(core)),
            StrategyKind::Inverted => Box::new(InvertedStrategy::new(core)),
            StrategyKind::Mixed => Box::new(MixedStrategy::new(core)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BinaryBitmap, EngineError, EngineResult, RecognitionEngine};
    use barscan_core::PixelBuffer;
    use nalgebra::Point2;
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct PointOnlyEngine {
        hints: EngineHints,
    }

    impl RecognitionEngine for PointOnlyEngine {
        fn decode(&mut self, _bitmap: &BinaryBitmap<'_>) -> Result<EngineResult, EngineError> {
            if let Some(cb) = &self.hints.point_callback {
                cb.found(Point2::new(4.0, 2.0));
            }
            Err(EngineError::NotFound)
        }

        fn reset(&mut self) {}
    }

    #[test]
    fn factory_wires_point_callback_and_forwards_hints() {
        let seen: Arc<Mutex<Vec<EngineHints>>> = Arc::default();
        let seen_in_builder = seen.clone();
        let factory = DefaultDecoderFactory::new(move |hints: EngineHints| {
            seen_in_builder.lock().push(hints.clone());
            Box::new(PointOnlyEngine { hints }) as Box<dyn RecognitionEngine>
        });

        let options = DecodeOptions {
            try_harder: true,
            also_inverted: true,
            strategy: StrategyKind::Mixed,
            ..DecodeOptions::default()
        }
        .with_formats([BarcodeFormat::QrCode]);

        let mut decoder = factory.create_decoder(&options);
        assert_eq!(decoder.kind(), StrategyKind::Mixed);

        let hints = seen.lock()[0].clone();
        assert!(hints.try_harder && hints.also_inverted);
        assert_eq!(
            hints.possible_formats,
            Some(BTreeSet::from([BarcodeFormat::QrCode]))
        );

        let frame = PixelBuffer::from_dense(vec![0, 255, 255, 0], 2, 2).unwrap();
        assert!(decoder.decode(&frame).decoded().is_none());
        assert_eq!(decoder.possible_result_points(), vec![Point2::new(4.0, 2.0)]);
    }

    #[test]
    fn each_decoder_gets_its_own_collector() {
        let factory = DefaultDecoderFactory::new(|hints: EngineHints| {
            Box::new(PointOnlyEngine { hints }) as Box<dyn RecognitionEngine>
        });
        let options = DecodeOptions::default();
        let mut a = factory.create_decoder(&options);
        let b = factory.create_decoder(&options);
        let frame = PixelBuffer::from_dense(vec![9; 4], 2, 2).unwrap();
        a.decode(&frame);
        assert_eq!(a.possible_result_points().len(), 1);
        assert!(b.possible_result_points().is_empty());
    }

    #[test]
    fn empty_allow_list_means_all_formats() {
        let options = DecodeOptions {
            possible_formats: Some(BTreeSet::new()),
            ..DecodeOptions::default()
        };
        assert_eq!(options.hints(PointCollector::new()).possible_formats, None);
    }

    #[test]
    fn options_parse_from_partial_json() {
        let options: DecodeOptions =
            serde_json::from_str(r#"{"strategy":"mixed","possible_formats":["EAN_13"]}"#)
                .unwrap();
        assert_eq!(options.strategy, StrategyKind::Mixed);
        assert_eq!(options.binarizer, BinarizerKind::Block);
        assert!(!options.try_harder);

        let product = DecodeOptions::default().with_family(BarcodeFamily::Product);
        assert!(product
            .possible_formats
            .as_ref()
            .is_some_and(|f| f.contains(&BarcodeFormat::Ean13)));
    }
}
