//! Preservation checks for translated course content.
//!
//! Template placeholders, URLs, numbers and markdown links must survive a
//! translation untouched. A dropped placeholder breaks rendering, so it is
//! reported as an error; everything else is a warning.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Validation report containing errors and warnings about a translation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationReport {
    /// Issues that break the translated content
    pub errors: Vec<String>,

    /// Issues worth a reviewer's attention
    pub warnings: Vec<String>,

    /// Elements found in the original that had to be preserved
    pub checked: usize,

    /// How many of those were found in the translation
    pub preserved: usize,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        !self.has_errors() && !self.has_warnings()
    }

    /// Share of protected elements that survived, 1.0 when there were none.
    pub fn preservation_ratio(&self) -> f64 {
        if self.checked == 0 {
            1.0
        } else {
            self.preserved as f64 / self.checked as f64
        }
    }

    /// Errors first, then warnings.
    pub fn issues(&self) -> impl Iterator<Item = &String> {
        self.errors.iter().chain(self.warnings.iter())
    }
}

pub struct PreservationValidator;

static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();
static URL_REGEX: OnceLock<Regex> = OnceLock::new();
static NUMBER_REGEX: OnceLock<Regex> = OnceLock::new();
static MARKDOWN_LINK_REGEX: OnceLock<Regex> = OnceLock::new();

fn placeholder_regex() -> &'static Regex {
    PLACEHOLDER_REGEX.get_or_init(|| {
        Regex::new(r"\{\{\s*[A-Za-z0-9_.]+\s*\}\}|\{[A-Za-z0-9_]+\}|%(?:\d+\$)?[sd]").unwrap()
    })
}

fn url_regex() -> &'static Regex {
    URL_REGEX.get_or_init(|| Regex::new(r"https?://[^\s)\]]+").unwrap())
}

/// Count how many items of `expected` appear in `actual`, respecting
/// multiplicity.
fn count_preserved(expected: &[String], actual: &[String]) -> usize {
    let mut available: HashMap<&str, usize> = HashMap::new();
    for item in actual {
        *available.entry(item.as_str()).or_default() += 1;
    }

    expected
        .iter()
        .filter(|item| match available.get_mut(item.as_str()) {
            Some(n) if *n > 0 => {
                *n -= 1;
                true
            }
            _ => false,
        })
        .count()
}

impl PreservationValidator {
    pub fn validate(original: &str, translated: &str) -> ValidationReport {
        let mut report = ValidationReport::new();

        let orig = Self::extract_placeholders(original);
        let trans = Self::extract_placeholders(translated);
        let kept = count_preserved(&orig, &trans);
        report.checked += orig.len();
        report.preserved += kept;
        if kept < orig.len() {
            report.errors.push(format!(
                "Placeholder mismatch: original has {:?}, translation has {:?}",
                orig, trans
            ));
        } else if trans.len() > orig.len() {
            report.warnings.push(format!(
                "Translation introduces placeholders not in the original: {:?}",
                trans
            ));
        }

        let orig = Self::extract_urls(original);
        let trans = Self::extract_urls(translated);
        let kept = count_preserved(&orig, &trans);
        report.checked += orig.len();
        report.preserved += kept;
        if kept < orig.len() {
            report.warnings.push(format!(
                "URL mismatch: original has {} URLs, translation kept {}",
                orig.len(),
                kept
            ));
        }

        let orig = Self::extract_numbers(original);
        let trans = Self::extract_numbers(translated);
        let kept = count_preserved(&orig, &trans);
        report.checked += orig.len();
        report.preserved += kept;
        if kept < orig.len() {
            report.warnings.push(format!(
                "Number mismatch: original has {:?}, translation has {:?}",
                orig, trans
            ));
        }

        // Link text is translated, so only the count is comparable
        let orig_links = Self::extract_markdown_links(original).len();
        let trans_links = Self::extract_markdown_links(translated).len();
        if orig_links > 0 {
            report.checked += orig_links;
            report.preserved += orig_links.min(trans_links);
        }
        if orig_links != trans_links {
            report.warnings.push(format!(
                "Markdown link count mismatch: original has {}, translation has {}",
                orig_links, trans_links
            ));
        }

        report
    }

    /// `{{name}}`, `{count}` and printf-style `%s` / `%1$d`
    fn extract_placeholders(text: &str) -> Vec<String> {
        placeholder_regex()
            .find_iter(text)
            .map(|m| m.as_str().split_whitespace().collect::<String>())
            .collect()
    }

    fn extract_urls(text: &str) -> Vec<String> {
        url_regex()
            .find_iter(text)
            .map(|m| m.as_str().trim_end_matches(['.', ',']).to_string())
            .collect()
    }

    /// Numbers outside of URLs and placeholders
    fn extract_numbers(text: &str) -> Vec<String> {
        let regex = NUMBER_REGEX.get_or_init(|| Regex::new(r"\d+(?:[.,]\d+)*").unwrap());
        let without_urls = url_regex().replace_all(text, " ");
        let stripped = placeholder_regex().replace_all(&without_urls, " ");

        regex
            .find_iter(&stripped)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    fn extract_markdown_links(text: &str) -> Vec<String> {
        let regex =
            MARKDOWN_LINK_REGEX.get_or_init(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").unwrap());

        regex
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect()
    }
}
