//! Session options, results and the JSON config wrapper.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use barscan_decode::{BarcodeFormat, DecodeOptions, Decoded, Metadata, MetadataKey};
use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::ScanIoError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// Stop after the first decoded symbol.
    #[default]
    Single,
    /// Keep scanning; report a text again only after a different one.
    Continuous,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LensFacing {
    /// Faces the user. Its frames are mirrored.
    Front,
    Back,
    /// Let the camera backend choose.
    #[default]
    Unspecified,
}

impl LensFacing {
    pub fn is_mirrored(self) -> bool {
        self == Self::Front
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    #[default]
    Idle,
    Starting,
    Running,
    Stopped,
}

impl ScanState {
    pub fn is_active(self) -> bool {
        matches!(self, Self::Starting | Self::Running)
    }
}

/// Options for one scan session.
///
/// Explicit calls to `set_torch` and `set_lens_facing` on the orchestrator
/// take precedence over `torch` and `lens_facing` here.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    pub decode: DecodeOptions,
    pub scan_mode: ScanMode,
    pub torch: bool,
    pub lens_facing: LensFacing,
    /// Report only these metadata keys; `None` reports everything kept.
    pub return_metadata: Option<BTreeSet<MetadataKey>>,
}

/// A decoded symbol as delivered to `ScanListener::on_result`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub text: String,
    pub format: BarcodeFormat,
    pub metadata: Metadata,
}

impl ScanResult {
    /// Conventional symbology name, e.g. `QR_CODE`.
    pub fn format_name(&self) -> &'static str {
        self.format.name()
    }

    pub(crate) fn from_decoded(decoded: Decoded, keep: Option<&BTreeSet<MetadataKey>>) -> Self {
        let mut metadata = decoded.metadata;
        if let Some(keys) = keep {
            metadata.retain_requested(keys);
        }
        Self {
            text: decoded.text,
            format: decoded.format,
            metadata,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// On-disk configuration: session options plus logging.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    #[serde(default)]
    pub options: ScanOptions,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            options: ScanOptions::default(),
            log_level: default_log_level(),
        }
    }
}

impl ScanConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ScanIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ScanIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Parsed `log_level`; unknown names fall back to `Info`.
    pub fn level_filter(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::Info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use barscan_decode::{BarcodeFamily, MetadataValue, StrategyKind};

    #[test]
    fn config_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.json");
        let config = ScanConfig {
            options: ScanOptions {
                decode: DecodeOptions::default()
                    .with_family(BarcodeFamily::Product)
                    .with_strategy(StrategyKind::Inverted),
                scan_mode: ScanMode::Continuous,
                torch: true,
                lens_facing: LensFacing::Front,
                return_metadata: Some(BTreeSet::from([MetadataKey::UpcEanExtension])),
            },
            log_level: "debug".into(),
        };
        config.write_json(&path).unwrap();
        let loaded = ScanConfig::load_json(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.level_filter(), LevelFilter::Debug);
    }

    #[test]
    fn sparse_config_uses_defaults() {
        let config: ScanConfig =
            serde_json::from_str(r#"{"options":{"scan_mode":"continuous"}}"#).unwrap();
        assert_eq!(config.options.scan_mode, ScanMode::Continuous);
        assert_eq!(config.options.lens_facing, LensFacing::Unspecified);
        assert_eq!(config.options.decode.strategy, StrategyKind::Normal);
        assert_eq!(config.level_filter(), LevelFilter::Info);
    }

    #[test]
    fn result_keeps_only_requested_metadata() {
        let decoded = Decoded {
            text: "4006381333931".into(),
            format: BarcodeFormat::Ean13,
            metadata: Metadata::from_engine([
                (MetadataKey::Orientation, MetadataValue::Int(0)),
                (MetadataKey::PossibleCountry, MetadataValue::Text("DE".into())),
            ]),
        };
        let keep = BTreeSet::from([MetadataKey::PossibleCountry]);
        let result = ScanResult::from_decoded(decoded, Some(&keep));
        assert_eq!(result.format_name(), "EAN_13");
        assert_eq!(result.metadata.len(), 1);
    }
}
