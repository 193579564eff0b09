//! Language registry: single source of truth for the languages courses can
//! be localized into.
//!
//! The registry is immutable metadata, so it lives in a process-wide
//! `OnceLock` rather than inside a service instance.

use std::sync::OnceLock;

/// Metadata for a supported language.
#[derive(Debug, Clone)]
pub struct LanguageConfig {
    /// ISO 639-1 language code (e.g., "en", "sw")
    pub code: &'static str,

    /// English name of the language (e.g., "Swahili")
    pub name: &'static str,

    /// Native name of the language (e.g., "Kiswahili")
    pub native_name: &'static str,

    /// Whether this is the base language every asset and fallback resolves to
    pub is_canonical: bool,
}

/// Registry of supported languages.
pub struct LanguageRegistry {
    languages: Vec<LanguageConfig>,
}

static REGISTRY: OnceLock<LanguageRegistry> = OnceLock::new();

impl LanguageRegistry {
    /// Get the global language registry instance.
    pub fn get() -> &'static LanguageRegistry {
        REGISTRY.get_or_init(|| LanguageRegistry {
            languages: default_languages(),
        })
    }

    /// Look a language up by its code (case-insensitive).
    pub fn get_by_code(&self, code: &str) -> Option<&LanguageConfig> {
        self.languages
            .iter()
            .find(|lang| lang.code.eq_ignore_ascii_case(code))
    }

    /// Get the canonical language configuration.
    ///
    /// # Panics
    /// Panics if the built-in table does not contain exactly one canonical
    /// language, which would be a programming error.
    pub fn canonical(&self) -> &LanguageConfig {
        let canonical_langs: Vec<_> = self
            .languages
            .iter()
            .filter(|lang| lang.is_canonical)
            .collect();

        match canonical_langs.len() {
            0 => panic!("No canonical language found in registry"),
            1 => canonical_langs[0],
            _ => panic!("Multiple canonical languages found in registry"),
        }
    }
}

/// The marketplace serves anglophone and francophone Africa first, plus the
/// major languages its instructors publish in.
fn default_languages() -> Vec<LanguageConfig> {
    let lang = |code, name, native_name| LanguageConfig {
        code,
        name,
        native_name,
        is_canonical: code == "en",
    };

    vec![
        lang("en", "English", "English"),
        lang("fr", "French", "Français"),
        lang("es", "Spanish", "Español"),
        lang("pt", "Portuguese", "Português"),
        lang("ar", "Arabic", "العربية"),
        lang("sw", "Swahili", "Kiswahili"),
        lang("yo", "Yoruba", "Yorùbá"),
        lang("ha", "Hausa", "Hausa"),
        lang("ig", "Igbo", "Igbo"),
        lang("zu", "Zulu", "isiZulu"),
        lang("am", "Amharic", "አማርኛ"),
        lang("de", "German", "Deutsch"),
        lang("zh", "Chinese", "中文"),
    ]
}
