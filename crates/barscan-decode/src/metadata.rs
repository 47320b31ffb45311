//! Result metadata reported alongside decoded text.

use std::collections::{btree_map, BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetadataKey {
    /// Degrees the symbol was rotated from upright.
    Orientation,
    /// Raw byte segments of 2D symbols.
    ByteSegments,
    ErrorCorrectionLevel,
    /// Periodical issue number from an EAN-2 extension.
    IssueNumber,
    /// Price from an EAN-5 extension.
    SuggestedPrice,
    /// Country of origin guessed from a UPC/EAN prefix.
    PossibleCountry,
    UpcEanExtension,
    SymbologyIdentifier,
    StructuredAppendSequence,
    StructuredAppendParity,
    Pdf417ExtraMetadata,
    Other,
}

impl MetadataKey {
    /// Keys that survive into a [`Metadata`] map, and the value shape each carries.
    const fn expected_shape(self) -> Option<Shape> {
        match self {
            Self::Orientation
            | Self::IssueNumber
            | Self::StructuredAppendSequence
            | Self::StructuredAppendParity => Some(Shape::Int),
            Self::ErrorCorrectionLevel
            | Self::SuggestedPrice
            | Self::PossibleCountry
            | Self::UpcEanExtension
            | Self::SymbologyIdentifier => Some(Shape::Text),
            Self::ByteSegments => Some(Shape::Bytes),
            Self::Pdf417ExtraMetadata | Self::Other => None,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Shape {
    Int,
    Text,
    Bytes,
}

/// A metadata value as reported by an engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Int(i32),
    Text(String),
    Bytes(Vec<Vec<u8>>),
    /// Anything else; never kept in [`Metadata`].
    Opaque(String),
}

impl MetadataValue {
    fn shape(&self) -> Option<Shape> {
        match self {
            Self::Int(_) => Some(Shape::Int),
            Self::Text(_) => Some(Shape::Text),
            Self::Bytes(_) => Some(Shape::Bytes),
            Self::Opaque(_) => None,
        }
    }
}

/// Filtered, typed metadata for one decoded symbol.
///
/// Only keys with a well-known shape are kept: integers for orientation,
/// issue number and structured-append position; strings for EC level, price,
/// country, extension and symbology id; byte segments as a list of byte
/// arrays. Entries whose value does not match the key's shape are dropped.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<MetadataKey, MetadataValue>);

impl Metadata {
    pub fn from_engine(entries: impl IntoIterator<Item = (MetadataKey, MetadataValue)>) -> Self {
        let map = entries
            .into_iter()
            .filter(|(k, v)| k.expected_shape().is_some() && k.expected_shape() == v.shape())
            .collect();
        Self(map)
    }

    /// Keep only the requested keys.
    pub fn retain_requested(&mut self, requested: &BTreeSet<MetadataKey>) {
        self.0.retain(|k, _| requested.contains(k));
    }

    pub fn get(&self, key: MetadataKey) -> Option<&MetadataValue> {
        self.0.get(&key)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, MetadataKey, MetadataValue> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn orientation(&self) -> Option<i32> {
        match self.get(MetadataKey::Orientation)? {
            MetadataValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn error_correction_level(&self) -> Option<&str> {
        self.text(MetadataKey::ErrorCorrectionLevel)
    }

    /// UPC/EAN add-on digits, if present and non-blank.
    pub fn upc_ean_extension(&self) -> Option<&str> {
        self.text(MetadataKey::UpcEanExtension)
            .filter(|s| !s.trim().is_empty())
    }

    pub fn byte_segments(&self) -> Option<&[Vec<u8>]> {
        match self.get(MetadataKey::ByteSegments)? {
            MetadataValue::Bytes(v) => Some(v),
            _ => None,
        }
    }

    fn text(&self, key: MetadataKey) -> Option<&str> {
        match self.get(key)? {
            MetadataValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl<'a> IntoIterator for &'a Metadata {
    type Item = (&'a MetadataKey, &'a MetadataValue);
    type IntoIter = btree_map::Iter<'a, MetadataKey, MetadataValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
