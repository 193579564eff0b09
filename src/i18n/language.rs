//! Language type: a language code validated against the registry.

use crate::error::{LocalizationError, Result};
use crate::i18n::{LanguageConfig, LanguageRegistry};

/// Source-language placeholder asking the engine to detect the language.
pub const AUTO_DETECT: &str = "auto";

/// A validated language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    /// ISO 639-1 language code
    code: &'static str,
}

impl Language {
    pub const ENGLISH: Language = Language { code: "en" };

    /// Create a Language from a language code string.
    ///
    /// Codes are matched case-insensitively; the returned language always
    /// carries the registry's lowercase code.
    pub fn from_code(code: &str) -> Result<Language> {
        LanguageRegistry::get()
            .get_by_code(code.trim())
            .map(|config| Language { code: config.code })
            .ok_or_else(|| LocalizationError::UnsupportedLanguage(code.to_string()))
    }

    /// Get the canonical language every fallback chain ends with.
    pub fn canonical() -> Language {
        let config = LanguageRegistry::get().canonical();
        Language { code: config.code }
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    /// # Panics
    /// Panics if the code is missing from the registry, which cannot happen
    /// for a Language built through `from_code` or the constants.
    pub fn config(&self) -> &'static LanguageConfig {
        LanguageRegistry::get()
            .get_by_code(self.code)
            .expect("Language code should always be valid")
    }

    pub fn name(&self) -> &'static str {
        self.config().name
    }

    pub fn is_canonical(&self) -> bool {
        self.config().is_canonical
    }
}

/// Normalize a job's source language: either a supported code or `auto`.
pub fn normalize_source_code(code: &str) -> Result<String> {
    if code.trim().eq_ignore_ascii_case(AUTO_DETECT) {
        return Ok(AUTO_DETECT.to_string());
    }
    Language::from_code(code).map(|lang| lang.code().to_string())
}

/// Normalize a target (or asset) language to its registry code.
pub fn normalize_code(code: &str) -> Result<String> {
    Language::from_code(code).map(|lang| lang.code().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_english_constant() {
        assert_eq!(Language::ENGLISH.code(), "en");
        assert_eq!(Language::ENGLISH.name(), "English");
        assert!(Language::ENGLISH.is_canonical());
    }

    #[test]
    fn test_from_code_normalizes_case() {
        let lang = Language::from_code("FR").unwrap();
        assert_eq!(lang.code(), "fr");
        assert_eq!(lang.name(), "French");
        assert!(!lang.is_canonical());
    }

    #[test]
    fn test_from_code_unknown() {
        let err = Language::from_code("tlh").unwrap_err();
        assert!(matches!(err, LocalizationError::UnsupportedLanguage(ref c) if c == "tlh"));
    }

    #[test]
    fn test_canonical_is_english() {
        assert_eq!(Language::canonical(), Language::ENGLISH);
    }

    #[test]
    fn test_normalize_source_accepts_auto() {
        assert_eq!(normalize_source_code("AUTO").unwrap(), "auto");
        assert_eq!(normalize_source_code("Es").unwrap(), "es");
        assert!(normalize_source_code("??").is_err());
    }

    #[test]
    fn test_normalize_target_rejects_auto() {
        assert!(normalize_code("auto").is_err());
        assert_eq!(normalize_code(" sw ").unwrap(), "sw");
    }
}
