use examgrade_core::{BackoffPolicy, GradeError};
use serde::{Deserialize, Serialize};

/// Thresholds deciding when graded results are handed to a human.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ReviewPolicy {
    /// Per-item and average confidence below this counts as low.
    pub low_confidence_threshold: f64,
    /// Review when more than this share of items is low confidence.
    pub low_confidence_ratio: f64,
    /// Full re-evaluations allowed after failed quality checks.
    pub max_retries: u32,
    /// Share of `max_score` at which an answer counts as correct.
    pub correct_ratio: f64,
    /// Confidence assumed when the model reports none.
    pub default_confidence: f64,
}

impl Default for ReviewPolicy {
    fn default() -> Self {
        Self {
            low_confidence_threshold: 0.6,
            low_confidence_ratio: 0.3,
            max_retries: 2,
            correct_ratio: 0.7,
            default_confidence: 0.8,
        }
    }
}

/// Summing equal confidences can land a hair below the threshold.
const CONFIDENCE_EPSILON: f64 = 1e-9;

impl ReviewPolicy {
    /// Strictly below the threshold; a value equal to it is not low.
    pub fn is_low_confidence(&self, confidence: f64) -> bool {
        self.low_confidence_threshold - confidence > CONFIDENCE_EPSILON
    }

    /// Mean of `scores`, or `default_confidence` when nothing was scored.
    pub fn average_confidence(&self, scores: &[f64]) -> f64 {
        if scores.is_empty() {
            return self.default_confidence;
        }
        scores.iter().sum::<f64>() / scores.len() as f64
    }

    pub fn needs_review(&self, scores: &[f64]) -> bool {
        let low = scores
            .iter()
            .filter(|score| self.is_low_confidence(**score))
            .count();
        self.is_low_confidence(self.average_confidence(scores))
            || low as f64 > scores.len() as f64 * self.low_confidence_ratio
    }

    pub fn is_correct(&self, score: f64, max_score: f64) -> bool {
        score >= max_score * self.correct_ratio
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ToolSettings {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl ToolSettings {
    pub const fn new(temperature: f32, max_output_tokens: u32) -> Self {
        Self {
            temperature,
            max_output_tokens,
        }
    }
}

/// Sampling settings per tool. Extraction is pinned to temperature 0 so the
/// model copies text instead of paraphrasing it.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ToolProfiles {
    pub parse: ToolSettings,
    pub evaluate: ToolSettings,
    pub quality_check: ToolSettings,
    pub analyze: ToolSettings,
    pub chat: ToolSettings,
}

impl Default for ToolProfiles {
    fn default() -> Self {
        Self {
            parse: ToolSettings::new(0.0, 8192),
            evaluate: ToolSettings::new(0.2, 2048),
            quality_check: ToolSettings::new(0.1, 1024),
            analyze: ToolSettings::new(0.3, 2048),
            chat: ToolSettings::new(0.7, 1024),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AgentConfig {
    /// Model override sent with every request. Empty uses the client default.
    pub model: String,
    pub review: ReviewPolicy,
    pub backoff: BackoffPolicy,
    pub tools: ToolProfiles,
}

impl AgentConfig {
    pub fn from_json(raw: &str) -> Result<Self, GradeError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), GradeError> {
        let review = &self.review;
        for (name, value) in [
            ("low_confidence_threshold", review.low_confidence_threshold),
            ("low_confidence_ratio", review.low_confidence_ratio),
            ("correct_ratio", review.correct_ratio),
            ("default_confidence", review.default_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(GradeError::InvalidConfig(format!(
                    "review.{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if self.backoff.max_attempts == 0 {
            return Err(GradeError::InvalidConfig(
                "backoff.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
