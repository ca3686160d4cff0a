//! Backend-specific generation options passed through to the model.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use typed_builder::TypedBuilder;

/// Opaque generation options sent alongside the messages.
///
/// The client does not interpret these; it only serializes them into the
/// request body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomFields(Map<String, Value>);

impl CustomFields {
    /// Creates an empty set of custom fields.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the fields with `key` set to `value`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Looks up a field by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns true when no fields are set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the fields.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl From<Map<String, Value>> for CustomFields {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for CustomFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// The size of a generated image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageSize {
    /// 1024x1024
    #[serde(rename = "1024x1024")]
    Square,
    /// 1024x1792
    #[serde(rename = "1024x1792")]
    Portrait,
    /// 1792x1024
    #[serde(rename = "1792x1024")]
    Landscape,
}

/// The quality of a generated image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageQuality {
    /// Default quality
    Standard,
    /// Finer details and greater consistency across the image
    Hd,
}

/// The style of a generated image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageStyle {
    /// Hyper-real and dramatic
    Vivid,
    /// More natural, less hyper-real
    Natural,
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Square => write!(f, "1024x1024"),
            Self::Portrait => write!(f, "1024x1792"),
            Self::Landscape => write!(f, "1792x1024"),
        }
    }
}

impl fmt::Display for ImageQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => write!(f, "standard"),
            Self::Hd => write!(f, "hd"),
        }
    }
}

impl fmt::Display for ImageStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vivid => write!(f, "vivid"),
            Self::Natural => write!(f, "natural"),
        }
    }
}

/// Options understood by image generation deployments such as `dall-e-3`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, TypedBuilder)]
#[builder(doc)]
pub struct ImageGenerationOptions {
    /// Size of the generated image
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<ImageSize>,
    /// Quality of the generated image
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<ImageQuality>,
    /// Style of the generated image
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<ImageStyle>,
}

impl From<ImageGenerationOptions> for CustomFields {
    fn from(options: ImageGenerationOptions) -> Self {
        [
            ("size", options.size.map(|v| v.to_string())),
            ("quality", options.quality.map(|v| v.to_string())),
            ("style", options.style.map(|v| v.to_string())),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|value| (key, value)))
        .collect()
    }
}
