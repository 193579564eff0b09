//! Default heuristic sub-metrics.
//!
//! None of these look at meaning. They catch the failures that matter for
//! course content: truncated output, untranslated output, broken templates
//! and terms a market has asked us to avoid.

use crate::quality::validator::PreservationValidator;
use crate::quality::{QualityMetric, ScoringInput};
use std::collections::HashMap;

/// Length-ratio accuracy.
///
/// A translation whose length is within the expected band of the source
/// scores 1.0; outside the band the score decays linearly.
pub struct LengthRatioAccuracy;

impl LengthRatioAccuracy {
    /// Accepted translated/source character ratio for a target language
    fn band(target_language: &str) -> (f64, f64) {
        match target_language {
            // Logographic scripts are much shorter than the source
            "zh" => (0.2, 1.5),
            _ => (0.5, 2.0),
        }
    }
}

impl QualityMetric for LengthRatioAccuracy {
    fn name(&self) -> &str {
        "accuracy"
    }

    fn score(&self, input: &ScoringInput<'_>) -> f64 {
        let source_len = input.source_text.trim().chars().count();
        let translated_len = input.translated_text.trim().chars().count();

        match (source_len, translated_len) {
            (0, 0) => return 1.0,
            (0, _) | (_, 0) => return 0.0,
            _ => {}
        }

        let ratio = translated_len as f64 / source_len as f64;
        let (low, high) = Self::band(input.target_language);
        if ratio < low {
            ratio / low
        } else if ratio > high {
            high / ratio
        } else {
            1.0
        }
    }
}

/// Penalises stuttering output and text that came back untranslated.
pub struct FluencyHeuristic {
    /// Deducted per adjacent repeated word ("the the")
    pub repetition_penalty: f64,
    /// Deducted when the output equals the input across languages
    pub untranslated_penalty: f64,
}

impl Default for FluencyHeuristic {
    fn default() -> Self {
        Self {
            repetition_penalty: 0.1,
            untranslated_penalty: 0.5,
        }
    }
}

fn adjacent_repeats(text: &str) -> usize {
    let words: Vec<String> = text
        .split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| w.chars().any(char::is_alphabetic))
        .collect();

    words.windows(2).filter(|pair| pair[0] == pair[1]).count()
}

impl QualityMetric for FluencyHeuristic {
    fn name(&self) -> &str {
        "fluency"
    }

    fn score(&self, input: &ScoringInput<'_>) -> f64 {
        let mut score = 1.0;

        // Repeats the source already had are not the translator's fault
        let introduced = adjacent_repeats(input.translated_text)
            .saturating_sub(adjacent_repeats(input.source_text));
        score -= introduced as f64 * self.repetition_penalty;

        let untranslated = !input.source_language.eq_ignore_ascii_case(input.target_language)
            && input
                .source_text
                .trim()
                .eq_ignore_ascii_case(input.translated_text.trim());
        if untranslated {
            score -= self.untranslated_penalty;
        }

        score
    }
}

/// Share of placeholders, URLs, numbers and markdown links preserved.
pub struct PreservationConsistency;

impl QualityMetric for PreservationConsistency {
    fn name(&self) -> &str {
        "consistency"
    }

    fn score(&self, input: &ScoringInput<'_>) -> f64 {
        PreservationValidator::validate(input.source_text, input.translated_text).preservation_ratio()
    }
}

/// Flags terms a target market considers inappropriate.
///
/// Each flagged term found in the translation costs `penalty`.
pub struct FlaggedTerms {
    terms: HashMap<String, Vec<String>>,
    pub penalty: f64,
}

impl Default for FlaggedTerms {
    fn default() -> Self {
        Self {
            terms: HashMap::new(),
            penalty: 0.25,
        }
    }
}

impl FlaggedTerms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_terms<I, S>(mut self, language: &str, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.terms
            .entry(language.to_lowercase())
            .or_default()
            .extend(terms.into_iter().map(|t| t.into().to_lowercase()));
        self
    }

    fn hits(&self, language: &str, text: &str) -> usize {
        let Some(terms) = self.terms.get(&language.to_lowercase()) else {
            return 0;
        };
        let lowered = text.to_lowercase();
        terms.iter().filter(|term| lowered.contains(term.as_str())).count()
    }
}

impl QualityMetric for FlaggedTerms {
    fn name(&self) -> &str {
        "cultural"
    }

    fn score(&self, input: &ScoringInput<'_>) -> f64 {
        1.0 - self.hits(input.target_language, input.translated_text) as f64 * self.penalty
    }
}
