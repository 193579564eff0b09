use crate::assets::{
    variant_id, AssetPatch, AssetProbe, AssetRegistration, AssetType, LocalizedAsset,
};
use crate::error::{LocalizationError, Result};
use crate::i18n::{normalize_code, Language};
use crate::metrics::EngineMetrics;
use crate::storage::Repository;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

const DEFAULT_REGION: &str = "default";
const MAX_WARNINGS: usize = 100;

/// Resolved URLs for one base id. `generation` moves on every mutation of
/// that base id so a lookup that raced a mutation can tell its result is
/// stale.
#[derive(Debug, Default)]
struct CachedUrls {
    generation: u64,
    urls: HashMap<(String, String), String>,
}

/// One cache entry, flattened for snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedUrl {
    pub asset_id: String,
    pub language: String,
    pub region: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetWarning {
    pub asset_id: String,
    pub language: String,
    pub url: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PreloadReport {
    pub language: String,
    pub loaded: Vec<String>,
    pub failed: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AssetStatistics {
    pub total_variants: usize,
    pub total_base_assets: usize,
    pub by_type: BTreeMap<String, usize>,
    pub by_language: BTreeMap<String, usize>,
    /// Percentage of base assets that have a variant in each language
    pub coverage: BTreeMap<String, f64>,
    pub cache_size: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub unreachable_urls: usize,
}

fn normalize_region(region: Option<&str>) -> Option<String> {
    region
        .map(str::trim)
        .filter(|r| !r.is_empty() && !r.eq_ignore_ascii_case(DEFAULT_REGION))
        .map(str::to_uppercase)
}

/// Pick a variant for `language`/`region` from the variants of one base id.
///
/// Order: exact language and region, the language alone, the declared
/// fallback language, then the canonical language. `candidates` must be
/// sorted by id so the outcome is deterministic.
fn resolve_variant<'a>(
    candidates: &'a [LocalizedAsset],
    language: &str,
    region: Option<&str>,
) -> Option<&'a LocalizedAsset> {
    let in_language = |lang: &str| -> Option<&'a LocalizedAsset> {
        candidates
            .iter()
            .find(|a| a.language == lang && a.region.is_none())
            .or_else(|| candidates.iter().find(|a| a.language == lang))
    };

    if let Some(region) = region {
        if let Some(exact) = candidates
            .iter()
            .find(|a| a.language == language && a.region.as_deref() == Some(region))
        {
            return Some(exact);
        }
    }

    if let Some(found) = in_language(language) {
        return Some(found);
    }

    let declared = candidates
        .iter()
        .filter(|a| a.language == language)
        .chain(candidates.iter())
        .find_map(|a| a.fallback_language.as_deref());
    if let Some(found) = declared.and_then(in_language) {
        return Some(found);
    }

    in_language(Language::canonical().code())
}

/// Localized asset store with a fallback-chain resolver and a URL cache.
pub struct AssetResolver {
    repo: Arc<dyn Repository<LocalizedAsset>>,
    cache: DashMap<String, CachedUrls>,
    probe: Arc<dyn AssetProbe>,
    metrics: Arc<EngineMetrics>,
    warnings: Mutex<VecDeque<AssetWarning>>,
}

impl AssetResolver {
    pub fn new(
        repo: Arc<dyn Repository<LocalizedAsset>>,
        probe: Arc<dyn AssetProbe>,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self {
            repo,
            cache: DashMap::new(),
            probe,
            metrics,
            warnings: Mutex::new(VecDeque::new()),
        }
    }

    /// Register (or replace) a variant.
    pub fn add_asset(&self, registration: AssetRegistration) -> Result<LocalizedAsset> {
        let base_id = registration.base_id.trim().to_string();
        if base_id.is_empty() || base_id.contains(char::is_whitespace) {
            return Err(LocalizationError::InvalidInput(format!(
                "invalid asset base id '{}'",
                registration.base_id
            )));
        }
        if registration.url.trim().is_empty() {
            return Err(LocalizationError::InvalidInput(format!(
                "asset {} has an empty url",
                base_id
            )));
        }

        let language = normalize_code(&registration.language)?;
        let region = normalize_region(registration.region.as_deref());
        let fallback_language = registration
            .fallback_language
            .as_deref()
            .map(normalize_code)
            .transpose()?;
        let id = variant_id(&base_id, &language, region.as_deref());

        if let Some(other) = self
            .variants_of(&base_id)
            .into_iter()
            .find(|a| a.id != id && a.asset_type != registration.asset_type)
        {
            return Err(LocalizationError::InvalidInput(format!(
                "asset {} is a {} but {} is registered as a {}",
                id, registration.asset_type, other.id, other.asset_type
            )));
        }

        let asset = LocalizedAsset {
            id,
            base_id,
            asset_type: registration.asset_type,
            url: registration.url.trim().to_string(),
            alt_text: registration.alt_text,
            caption: registration.caption,
            language,
            region,
            fallback_language,
            metadata: registration.metadata,
            updated_at: Utc::now(),
        };

        let replaced = self.repo.insert(asset.clone()).is_some();
        self.invalidate(&asset.base_id);
        info!(
            "{} asset {} ({})",
            if replaced { "Replaced" } else { "Added" },
            asset.id,
            asset.asset_type
        );
        Ok(asset)
    }

    pub fn update_asset(&self, variant_id: &str, patch: AssetPatch) -> Result<LocalizedAsset> {
        let fallback_language = patch
            .fallback_language
            .as_deref()
            .map(normalize_code)
            .transpose()?;
        if patch.url.as_deref().is_some_and(|u| u.trim().is_empty()) {
            return Err(LocalizationError::InvalidInput(format!(
                "asset {} cannot have an empty url",
                variant_id
            )));
        }

        let asset = self.repo.update(variant_id, &mut |asset: &mut LocalizedAsset| {
            if let Some(url) = &patch.url {
                asset.url = url.trim().to_string();
            }
            if let Some(alt_text) = &patch.alt_text {
                asset.alt_text = alt_text.clone();
            }
            if let Some(caption) = &patch.caption {
                asset.caption = caption.clone();
            }
            if fallback_language.is_some() {
                asset.fallback_language = fallback_language.clone();
            }
            if let Some(metadata) = &patch.metadata {
                asset.metadata = metadata.clone();
            }
            asset.updated_at = Utc::now();
            Ok(())
        })?;

        self.invalidate(&asset.base_id);
        info!("Updated asset {}", asset.id);
        Ok(asset)
    }

    pub fn remove_asset(&self, variant_id: &str) -> Result<LocalizedAsset> {
        let asset = self
            .repo
            .remove(variant_id)
            .ok_or_else(|| LocalizationError::not_found("asset", variant_id))?;
        self.invalidate(&asset.base_id);
        info!("Removed asset {}", asset.id);
        Ok(asset)
    }

    /// Resolve a variant of `base_id` through the fallback chain.
    pub fn get_asset(&self, base_id: &str, language: &str, region: Option<&str>) -> Option<LocalizedAsset> {
        let candidates = self.variants_of(base_id);
        let language = language.trim().to_lowercase();
        let region = normalize_region(region);
        resolve_variant(&candidates, &language, region.as_deref()).cloned()
    }

    /// Like `get_asset`, but never returns a variant of another type.
    pub fn get_asset_of_type(
        &self,
        base_id: &str,
        asset_type: AssetType,
        language: &str,
        region: Option<&str>,
    ) -> Option<LocalizedAsset> {
        let candidates: Vec<LocalizedAsset> = self
            .variants_of(base_id)
            .into_iter()
            .filter(|a| a.asset_type == asset_type)
            .collect();
        let language = language.trim().to_lowercase();
        let region = normalize_region(region);
        resolve_variant(&candidates, &language, region.as_deref()).cloned()
    }

    /// Resolve to a URL, serving repeat lookups from the cache.
    ///
    /// The URL is probed once when it enters the cache. An unreachable URL
    /// is logged and still returned.
    pub async fn get_asset_url(&self, base_id: &str, language: &str, region: Option<&str>) -> Option<String> {
        let language = language.trim().to_lowercase();
        let region = normalize_region(region);
        let key = (language.clone(), region.clone().unwrap_or_else(|| DEFAULT_REGION.to_string()));

        let generation = match self.cache.get(base_id) {
            Some(entry) => {
                if let Some(url) = entry.urls.get(&key) {
                    self.metrics.record_cache_hit();
                    return Some(url.clone());
                }
                entry.generation
            }
            None => 0,
        };
        self.metrics.record_cache_miss();

        let asset = self.get_asset(base_id, &language, region.as_deref())?;
        if !self.probe.is_reachable(&asset.url).await {
            self.record_unreachable(&asset, &language);
        }

        let mut entry = self.cache.entry(base_id.to_string()).or_default();
        if entry.generation == generation {
            entry.urls.insert(key, asset.url.clone());
        } else {
            debug!("Asset {} changed during lookup; not caching", base_id);
        }
        Some(asset.url)
    }

    /// Resolve and cache every base asset for `language`, concurrently.
    pub async fn preload_assets(&self, language: &str) -> Result<PreloadReport> {
        let language = normalize_code(language)?;
        let base_ids = self.base_ids();

        let lookups = base_ids.iter().map(|base_id| {
            let language = language.clone();
            async move { (base_id, self.get_asset_url(base_id, &language, None).await) }
        });
        let results = futures::future::join_all(lookups).await;

        let mut report = PreloadReport {
            language: language.clone(),
            ..Default::default()
        };
        for (base_id, url) in results {
            match url {
                Some(_) => report.loaded.push(base_id.clone()),
                None => {
                    let e = LocalizationError::AssetResolution {
                        asset_id: base_id.clone(),
                        language: language.clone(),
                    };
                    debug!("Preload: {}", e);
                    report.failed.push(base_id.clone());
                }
            }
        }

        info!(
            "Preloaded {} assets for {} ({} unresolved)",
            report.loaded.len(),
            language,
            report.failed.len()
        );
        Ok(report)
    }

    /// Base ids that exist in some language but have no `language` variant.
    pub fn get_missing_assets(&self, language: &str) -> Vec<String> {
        let language = language.trim().to_lowercase();
        let assets = self.repo.list();
        let present: BTreeSet<&str> = assets
            .iter()
            .filter(|a| a.language == language)
            .map(|a| a.base_id.as_str())
            .collect();

        assets
            .iter()
            .map(|a| a.base_id.as_str())
            .filter(|base| !present.contains(base))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    pub fn statistics(&self) -> AssetStatistics {
        let assets = self.repo.list();
        let mut stats = AssetStatistics {
            total_variants: assets.len(),
            cache_size: self.cache.iter().map(|entry| entry.urls.len()).sum(),
            cache_hits: self.metrics.cache_hits(),
            cache_misses: self.metrics.cache_misses(),
            unreachable_urls: self.metrics.unreachable_assets(),
            ..Default::default()
        };

        let mut bases_by_language: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        let mut bases = BTreeSet::new();
        for asset in &assets {
            *stats.by_type.entry(asset.asset_type.to_string()).or_default() += 1;
            *stats.by_language.entry(asset.language.clone()).or_default() += 1;
            bases.insert(asset.base_id.as_str());
            bases_by_language
                .entry(asset.language.as_str())
                .or_default()
                .insert(asset.base_id.as_str());
        }

        stats.total_base_assets = bases.len();
        for (language, covered) in bases_by_language {
            let percent = covered.len() as f64 / bases.len() as f64 * 100.0;
            stats.coverage.insert(language.to_string(), percent);
        }
        stats
    }

    /// Most recent unreachable-URL warnings, oldest first.
    pub fn recent_warnings(&self) -> Vec<AssetWarning> {
        let warnings = self.warnings.lock().unwrap_or_else(PoisonError::into_inner);
        warnings.iter().cloned().collect()
    }

    pub fn cached_urls(&self) -> Vec<CachedUrl> {
        let mut urls: Vec<CachedUrl> = self
            .cache
            .iter()
            .flat_map(|entry| {
                let asset_id = entry.key().clone();
                entry
                    .urls
                    .iter()
                    .map(|((language, region), url)| CachedUrl {
                        asset_id: asset_id.clone(),
                        language: language.clone(),
                        region: (region != DEFAULT_REGION).then(|| region.clone()),
                        url: url.clone(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        urls.sort_by(|a, b| {
            (&a.asset_id, &a.language, &a.region).cmp(&(&b.asset_id, &b.language, &b.region))
        });
        urls
    }

    /// Put a cache entry back without probing (snapshot restore).
    pub fn restore_cached_url(&self, cached: CachedUrl) {
        let region = cached.region.unwrap_or_else(|| DEFAULT_REGION.to_string());
        self.cache
            .entry(cached.asset_id)
            .or_default()
            .urls
            .insert((cached.language, region), cached.url);
    }

    /// Store a variant as-is (snapshot restore).
    pub fn restore(&self, asset: LocalizedAsset) {
        self.repo.insert(asset);
    }

    pub fn all(&self) -> Vec<LocalizedAsset> {
        let mut assets = self.repo.list();
        assets.sort_by(|a, b| a.id.cmp(&b.id));
        assets
    }

    /// Drop every variant and every cached URL.
    pub fn clear(&self) {
        self.repo.clear();
        self.cache.clear();
    }

    fn variants_of(&self, base_id: &str) -> Vec<LocalizedAsset> {
        let mut variants: Vec<LocalizedAsset> = self
            .repo
            .list()
            .into_iter()
            .filter(|a| a.base_id == base_id)
            .collect();
        variants.sort_by(|a, b| a.id.cmp(&b.id));
        variants
    }

    fn base_ids(&self) -> Vec<String> {
        self.repo
            .list()
            .into_iter()
            .map(|a| a.base_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn invalidate(&self, base_id: &str) {
        let mut entry = self.cache.entry(base_id.to_string()).or_default();
        entry.generation += 1;
        if !entry.urls.is_empty() {
            debug!("Invalidated {} cached URLs for {}", entry.urls.len(), base_id);
            entry.urls.clear();
        }
    }

    fn record_unreachable(&self, asset: &LocalizedAsset, language: &str) {
        warn!("Asset {} resolved to unreachable URL {}", asset.id, asset.url);
        self.metrics.record_unreachable_asset();

        let mut warnings = self.warnings.lock().unwrap_or_else(PoisonError::into_inner);
        if warnings.len() == MAX_WARNINGS {
            warnings.pop_front();
        }
        warnings.push_back(AssetWarning {
            asset_id: asset.id.clone(),
            language: language.to_string(),
            url: asset.url.clone(),
            at: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssumeReachable;
    use crate::storage::InMemoryRepository;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts probes and reports every URL unreachable.
    #[derive(Default)]
    struct DeadLinks {
        probes: AtomicUsize,
    }

    #[async_trait]
    impl AssetProbe for DeadLinks {
        async fn is_reachable(&self, _url: &str) -> bool {
            self.probes.fetch_add(1, Ordering::SeqCst);
            false
        }
    }

    fn resolver() -> AssetResolver {
        AssetResolver::new(
            Arc::new(InMemoryRepository::new()),
            Arc::new(AssumeReachable),
            Arc::new(EngineMetrics::new()),
        )
    }

    fn image(base: &str, lang: &str) -> AssetRegistration {
        AssetRegistration::new(base, AssetType::Image, lang, format!("/img/{}-{}.png", base, lang))
    }

    // ==================== Registration Tests ====================

    #[test]
    fn test_add_asset_builds_variant_id() {
        let r = resolver();
        let asset = r.add_asset(image("hero-bg", "ES").with_region("mx")).unwrap();
        assert_eq!(asset.id, "hero-bg-es-MX");
        assert_eq!(asset.language, "es");
        assert_eq!(asset.region.as_deref(), Some("MX"));
    }

    #[test]
    fn test_add_asset_rejects_type_mismatch() {
        let r = resolver();
        r.add_asset(image("intro", "en")).unwrap();
        let err = r
            .add_asset(AssetRegistration::new("intro", AssetType::Video, "fr", "/v/intro.mp4"))
            .unwrap_err();
        assert!(matches!(err, LocalizationError::InvalidInput(_)));
    }

    #[test]
    fn test_add_asset_same_variant_can_change_type_when_alone() {
        let r = resolver();
        r.add_asset(image("solo", "en")).unwrap();
        let replaced = r
            .add_asset(AssetRegistration::new("solo", AssetType::Document, "en", "/d/solo.pdf"))
            .unwrap();
        assert_eq!(replaced.asset_type, AssetType::Document);
        assert_eq!(r.all().len(), 1);
    }

    #[test]
    fn test_add_asset_validation() {
        let r = resolver();
        assert!(matches!(
            r.add_asset(image("hero", "xx")),
            Err(LocalizationError::UnsupportedLanguage(_))
        ));
        assert!(matches!(
            r.add_asset(image("bad id", "en")),
            Err(LocalizationError::InvalidInput(_))
        ));
        assert!(matches!(
            r.add_asset(AssetRegistration::new("hero", AssetType::Image, "en", " ")),
            Err(LocalizationError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_update_and_remove_unknown_variant() {
        let r = resolver();
        assert!(matches!(
            r.update_asset("ghost-en", AssetPatch::default()),
            Err(LocalizationError::NotFound { kind: "asset", .. })
        ));
        assert!(matches!(
            r.remove_asset("ghost-en"),
            Err(LocalizationError::NotFound { .. })
        ));
    }

    // ==================== Fallback Chain Tests ====================

    #[test]
    fn test_exact_region_match_wins() {
        let r = resolver();
        r.add_asset(image("hero", "pt")).unwrap();
        r.add_asset(image("hero", "pt").with_region("BR")).unwrap();

        assert_eq!(r.get_asset("hero", "pt", Some("BR")).unwrap().id, "hero-pt-BR");
        assert_eq!(r.get_asset("hero", "pt", None).unwrap().id, "hero-pt");
        assert_eq!(r.get_asset("hero", "pt", Some("AO")).unwrap().id, "hero-pt");
    }

    #[test]
    fn test_falls_back_to_english() {
        let r = resolver();
        r.add_asset(image("X", "en")).unwrap();
        assert_eq!(r.get_asset("X", "fr", None).unwrap().id, "X-en");
    }

    #[test]
    fn test_declared_fallback_before_english() {
        let r = resolver();
        r.add_asset(image("lesson", "en")).unwrap();
        r.add_asset(image("lesson", "fr")).unwrap();
        r.add_asset(image("lesson", "ha").with_fallback("fr")).unwrap();

        // Hausa request finds the Hausa variant directly
        assert_eq!(r.get_asset("lesson", "ha", None).unwrap().id, "lesson-ha");
        // Yoruba has no variant; the declared fallback (fr) beats en
        assert_eq!(r.get_asset("lesson", "yo", None).unwrap().id, "lesson-fr");
    }

    #[test]
    fn test_no_variant_resolves_to_none() {
        let r = resolver();
        r.add_asset(image("only-fr", "fr")).unwrap();
        assert!(r.get_asset("only-fr", "es", None).is_none());
        assert!(r.get_asset("missing", "en", None).is_none());
    }

    #[test]
    fn test_typed_lookup_never_returns_other_type() {
        let r = resolver();
        r.add_asset(image("banner", "en")).unwrap();
        assert!(r
            .get_asset_of_type("banner", AssetType::Video, "en", None)
            .is_none());
        assert_eq!(
            r.get_asset_of_type("banner", AssetType::Image, "fr", None)
                .unwrap()
                .id,
            "banner-en"
        );
    }

    // ==================== Cache Tests ====================

    #[tokio::test]
    async fn test_repeat_lookup_served_from_cache() {
        let r = resolver();
        r.add_asset(image("hero", "es")).unwrap();

        let first = r.get_asset_url("hero", "es", None).await.unwrap();
        let second = r.get_asset_url("hero", "es", None).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(r.metrics.cache_misses(), 1);
        assert_eq!(r.metrics.cache_hits(), 1);
        assert_eq!(r.statistics().cache_size, 1);
    }

    #[tokio::test]
    async fn test_mutation_invalidates_cached_urls() {
        let r = resolver();
        r.add_asset(image("hero", "en")).unwrap();
        assert_eq!(r.get_asset_url("hero", "fr", None).await.unwrap(), "/img/hero-en.png");

        r.add_asset(image("hero", "fr")).unwrap();
        assert_eq!(r.get_asset_url("hero", "fr", None).await.unwrap(), "/img/hero-fr.png");

        r.update_asset(
            "hero-fr",
            AssetPatch {
                url: Some("/img/hero-fr-v2.png".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(r.get_asset_url("hero", "fr", None).await.unwrap(), "/img/hero-fr-v2.png");

        r.remove_asset("hero-fr").unwrap();
        assert_eq!(r.get_asset_url("hero", "fr", None).await.unwrap(), "/img/hero-en.png");
    }

    #[tokio::test]
    async fn test_unreachable_url_is_still_returned() {
        let probe = Arc::new(DeadLinks::default());
        let r = AssetResolver::new(
            Arc::new(InMemoryRepository::new()),
            probe.clone(),
            Arc::new(EngineMetrics::new()),
        );
        r.add_asset(image("hero", "en")).unwrap();

        assert!(r.get_asset_url("hero", "en", None).await.is_some());
        assert!(r.get_asset_url("hero", "en", None).await.is_some());

        assert_eq!(probe.probes.load(Ordering::SeqCst), 1);
        assert_eq!(r.recent_warnings().len(), 1);
        assert_eq!(r.statistics().unreachable_urls, 1);
    }

    /// Blocks inside the probe until released.
    #[derive(Default)]
    struct GatedProbe {
        entered: tokio::sync::Notify,
        release: tokio::sync::Notify,
    }

    #[async_trait]
    impl AssetProbe for GatedProbe {
        async fn is_reachable(&self, _url: &str) -> bool {
            self.entered.notify_one();
            self.release.notified().await;
            true
        }
    }

    #[tokio::test]
    async fn test_lookup_racing_a_mutation_is_not_cached() {
        let probe = Arc::new(GatedProbe::default());
        let r = Arc::new(AssetResolver::new(
            Arc::new(InMemoryRepository::new()),
            probe.clone(),
            Arc::new(EngineMetrics::new()),
        ));
        r.add_asset(image("hero", "en")).unwrap();

        let lookup = {
            let r = r.clone();
            tokio::spawn(async move { r.get_asset_url("hero", "en", None).await })
        };
        probe.entered.notified().await;
        r.update_asset(
            "hero-en",
            AssetPatch {
                url: Some("/img/hero-en-v2.png".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        probe.release.notify_one();

        assert_eq!(lookup.await.unwrap().as_deref(), Some("/img/hero-en.png"));
        assert_eq!(r.statistics().cache_size, 0);

        probe.release.notify_one();
        assert_eq!(
            r.get_asset_url("hero", "en", None).await.as_deref(),
            Some("/img/hero-en-v2.png")
        );
    }

    #[test]
    fn test_cached_urls_roundtrip_through_restore() {
        let r = resolver();
        r.restore_cached_url(CachedUrl {
            asset_id: "hero".into(),
            language: "es".into(),
            region: None,
            url: "/img/hero-es.png".into(),
        });
        r.restore_cached_url(CachedUrl {
            asset_id: "hero".into(),
            language: "pt".into(),
            region: Some("BR".into()),
            url: "/img/hero-pt-BR.png".into(),
        });

        let urls = r.cached_urls();
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0].language, "es");
        assert_eq!(urls[0].region, None);
        assert_eq!(urls[1].region.as_deref(), Some("BR"));
    }

    // ==================== Preload / Coverage Tests ====================

    #[tokio::test]
    async fn test_preload_reports_loaded_and_failed() {
        let r = resolver();
        r.add_asset(image("a", "en")).unwrap();
        r.add_asset(image("b", "es")).unwrap();
        r.add_asset(image("c", "fr")).unwrap();

        let report = r.preload_assets("es").await.unwrap();
        assert_eq!(report.loaded, vec!["a", "b"]);
        assert_eq!(report.failed, vec!["c"]);
        assert_eq!(r.statistics().cache_size, 2);

        assert!(r.preload_assets("xx").await.is_err());
    }

    #[test]
    fn test_missing_assets() {
        let r = resolver();
        r.add_asset(image("hero-bg", "en")).unwrap();
        r.add_asset(image("hero-bg", "es")).unwrap();
        r.add_asset(image("logo", "en")).unwrap();
        r.add_asset(image("course-card", "en")).unwrap();

        assert_eq!(r.get_missing_assets("es"), vec!["course-card", "logo"]);
        assert!(r.get_missing_assets("en").is_empty());
    }

    #[test]
    fn test_statistics() {
        let r = resolver();
        r.add_asset(image("hero", "en")).unwrap();
        r.add_asset(image("hero", "es")).unwrap();
        r.add_asset(AssetRegistration::new("intro", AssetType::Video, "en", "/v/intro.mp4"))
            .unwrap();

        let stats = r.statistics();
        assert_eq!(stats.total_variants, 3);
        assert_eq!(stats.total_base_assets, 2);
        assert_eq!(stats.by_type["image"], 2);
        assert_eq!(stats.by_type["video"], 1);
        assert_eq!(stats.by_language["en"], 2);
        assert_eq!(stats.coverage["en"], 100.0);
        assert_eq!(stats.coverage["es"], 50.0);
    }

    // ==================== Property Tests ====================

    use proptest::prelude::*;

    const LANGS: [&str; 5] = ["en", "es", "fr", "sw", "de"];

    proptest! {
        /// Whatever variants exist, a lookup resolves to the requested
        /// language or to English, and the cached URL matches a fresh
        /// resolution.
        #[test]
        fn prop_resolution_and_cache_agree(
            present in proptest::collection::btree_set(0usize..5, 1..5),
            requested in 0usize..5,
        ) {
            let r = resolver();
            for &i in &present {
                r.add_asset(image("hero", LANGS[i])).unwrap();
            }
            let language = LANGS[requested];

            let resolved = r.get_asset("hero", language, None);
            match &resolved {
                Some(asset) => prop_assert!(asset.language == language || asset.language == "en"),
                None => prop_assert!(!present.contains(&requested) && !present.contains(&0)),
            }

            let first = tokio_test::block_on(r.get_asset_url("hero", language, None));
            let second = tokio_test::block_on(r.get_asset_url("hero", language, None));
            prop_assert_eq!(&first, &resolved.map(|a| a.url));
            prop_assert_eq!(first, second);
        }
    }
}
