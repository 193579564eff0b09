use crate::storage::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Image,
    Video,
    Audio,
    Document,
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AssetType::Image => "image",
            AssetType::Video => "video",
            AssetType::Audio => "audio",
            AssetType::Document => "document",
        };
        f.write_str(s)
    }
}

impl FromStr for AssetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "image" => Ok(AssetType::Image),
            "video" => Ok(AssetType::Video),
            "audio" => Ok(AssetType::Audio),
            "document" => Ok(AssetType::Document),
            _ => Err(format!("Invalid asset type: {}", s)),
        }
    }
}

/// One language (and optionally region) variant of a course asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalizedAsset {
    /// `{base_id}-{language}` or `{base_id}-{language}-{REGION}`
    pub id: String,
    pub base_id: String,
    #[serde(rename = "type")]
    pub asset_type: AssetType,
    pub url: String,
    #[serde(default)]
    pub alt_text: String,
    #[serde(default)]
    pub caption: String,
    pub language: String,
    pub region: Option<String>,
    /// Language to try when this base id has no variant for the request
    pub fallback_language: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub updated_at: DateTime<Utc>,
}

impl Record for LocalizedAsset {
    const KIND: &'static str = "asset";

    fn id(&self) -> &str {
        &self.id
    }
}

pub fn variant_id(base_id: &str, language: &str, region: Option<&str>) -> String {
    match region {
        Some(region) => format!("{}-{}-{}", base_id, language, region),
        None => format!("{}-{}", base_id, language),
    }
}

/// Content-management input for `add_asset`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetRegistration {
    pub base_id: String,
    #[serde(rename = "type")]
    pub asset_type: AssetType,
    pub url: String,
    #[serde(default)]
    pub alt_text: String,
    #[serde(default)]
    pub caption: String,
    pub language: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub fallback_language: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl AssetRegistration {
    pub fn new(
        base_id: impl Into<String>,
        asset_type: AssetType,
        language: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            base_id: base_id.into(),
            asset_type,
            url: url.into(),
            alt_text: String::new(),
            caption: String::new(),
            language: language.into(),
            region: None,
            fallback_language: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_fallback(mut self, language: impl Into<String>) -> Self {
        self.fallback_language = Some(language.into());
        self
    }

    pub fn with_alt_text(mut self, alt_text: impl Into<String>) -> Self {
        self.alt_text = alt_text.into();
        self
    }
}

/// Partial update for `update_asset`; `None` leaves a field as it is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetPatch {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub alt_text: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub fallback_language: Option<String>,
    #[serde(default)]
    pub metadata: Option<BTreeMap<String, String>>,
}

impl AssetPatch {
    pub fn is_empty(&self) -> bool {
        self.url.is_none()
            && self.alt_text.is_none()
            && self.caption.is_none()
            && self.fallback_language.is_none()
            && self.metadata.is_none()
    }
}
