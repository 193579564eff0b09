//! Localized course assets: images, videos, audio and documents with one
//! variant per language (and optionally region), resolved through a
//! fallback chain and cached by base id.

mod model;
mod probe;
mod resolver;

pub use model::{variant_id, AssetPatch, AssetRegistration, AssetType, LocalizedAsset};
pub use probe::{AssetProbe, AssumeReachable, HttpAssetProbe};
pub use resolver::{AssetResolver, AssetStatistics, AssetWarning, CachedUrl, PreloadReport};
