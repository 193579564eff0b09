//! Translation quality scoring.
//!
//! A score is the weighted sum of four sub-metrics, each producing a value
//! in [0, 1]: accuracy (0.30), fluency (0.25), consistency (0.25) and
//! cultural appropriateness (0.20). Any sub-metric can be swapped out.

mod metrics;
mod validator;

pub use metrics::{FlaggedTerms, FluencyHeuristic, LengthRatioAccuracy, PreservationConsistency};
pub use validator::{PreservationValidator, ValidationReport};

use serde::Serialize;

pub const ACCURACY_WEIGHT: f64 = 0.30;
pub const FLUENCY_WEIGHT: f64 = 0.25;
pub const CONSISTENCY_WEIGHT: f64 = 0.25;
pub const CULTURAL_WEIGHT: f64 = 0.20;

/// Everything a sub-metric may look at.
#[derive(Debug, Clone, Copy)]
pub struct ScoringInput<'a> {
    pub source_text: &'a str,
    pub translated_text: &'a str,
    pub source_language: &'a str,
    pub target_language: &'a str,
}

pub trait QualityMetric: Send + Sync {
    fn name(&self) -> &str;

    /// Raw score; the scorer clamps it into [0, 1].
    fn score(&self, input: &ScoringInput<'_>) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub accuracy: f64,
    pub fluency: f64,
    pub consistency: f64,
    pub cultural: f64,
    pub overall: f64,
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

pub struct QualityScorer {
    accuracy: Box<dyn QualityMetric>,
    fluency: Box<dyn QualityMetric>,
    consistency: Box<dyn QualityMetric>,
    cultural: Box<dyn QualityMetric>,
}

impl Default for QualityScorer {
    fn default() -> Self {
        Self {
            accuracy: Box::new(LengthRatioAccuracy),
            fluency: Box::new(FluencyHeuristic::default()),
            consistency: Box::new(PreservationConsistency),
            cultural: Box::new(FlaggedTerms::default()),
        }
    }
}

impl QualityScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accuracy(mut self, metric: impl QualityMetric + 'static) -> Self {
        self.accuracy = Box::new(metric);
        self
    }

    pub fn with_fluency(mut self, metric: impl QualityMetric + 'static) -> Self {
        self.fluency = Box::new(metric);
        self
    }

    pub fn with_consistency(mut self, metric: impl QualityMetric + 'static) -> Self {
        self.consistency = Box::new(metric);
        self
    }

    pub fn with_cultural(mut self, metric: impl QualityMetric + 'static) -> Self {
        self.cultural = Box::new(metric);
        self
    }

    /// Composite score in [0, 1].
    pub fn compute_score(
        &self,
        source_text: &str,
        translated_text: &str,
        source_language: &str,
        target_language: &str,
    ) -> f64 {
        self.breakdown(source_text, translated_text, source_language, target_language)
            .overall
    }

    pub fn breakdown(
        &self,
        source_text: &str,
        translated_text: &str,
        source_language: &str,
        target_language: &str,
    ) -> ScoreBreakdown {
        let input = ScoringInput {
            source_text,
            translated_text,
            source_language,
            target_language,
        };

        let accuracy = clamp_unit(self.accuracy.score(&input));
        let fluency = clamp_unit(self.fluency.score(&input));
        let consistency = clamp_unit(self.consistency.score(&input));
        let cultural = clamp_unit(self.cultural.score(&input));

        let overall = accuracy * ACCURACY_WEIGHT
            + fluency * FLUENCY_WEIGHT
            + consistency * CONSISTENCY_WEIGHT
            + cultural * CULTURAL_WEIGHT;

        ScoreBreakdown {
            accuracy,
            fluency,
            consistency,
            cultural,
            overall: clamp_unit(overall),
        }
    }
}
