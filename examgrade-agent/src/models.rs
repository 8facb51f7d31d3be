//! Records exchanged with the model and returned to callers.
//!
//! Model output is deserialized leniently: question numbers may arrive as
//! numeric strings, scores may be missing, and list fields may be absent.

use examgrade_core::Value;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_SCORE: f64 = 10.0;

/// Placeholder answer used when the answer sheet could not be parsed.
pub const ERROR_PARSING_ANSWER: &str = "[Error parsing]";
/// What the extraction prompt writes for a question the student skipped.
pub const NO_ANSWER_PROVIDED: &str = "[No answer provided]";

fn default_max_score() -> f64 {
    DEFAULT_MAX_SCORE
}

fn default_true() -> bool {
    true
}

fn default_verdict_confidence() -> f64 {
    0.9
}

fn default_analysis_confidence() -> f64 {
    0.8
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AnswerKeyQuestion {
    #[serde(deserialize_with = "lenient::number")]
    pub number: u32,
    #[serde(default)]
    pub question_text: String,
    #[serde(default)]
    pub expected_answer: String,
    #[serde(default = "default_max_score", deserialize_with = "lenient::max_score")]
    pub max_score: f64,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub keywords: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct AnswerKey {
    pub questions: Vec<AnswerKeyQuestion>,
    pub total_questions: usize,
    pub max_possible_score: f64,
    /// Set only on the degraded result of a failed parse.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnswerKey {
    pub fn new(questions: Vec<AnswerKeyQuestion>) -> Self {
        Self::assemble(questions, None, None, None)
    }

    /// The empty key returned when extraction fails.
    pub fn degraded(error: impl Into<String>) -> Self {
        Self {
            questions: Vec::new(),
            total_questions: 0,
            max_possible_score: 0.0,
            error: Some(error.into()),
        }
    }

    pub fn question(&self, number: u32) -> Option<&AnswerKeyQuestion> {
        self.questions.iter().find(|q| q.number == number)
    }

    fn assemble(
        questions: Vec<AnswerKeyQuestion>,
        total_questions: Option<usize>,
        max_possible_score: Option<f64>,
        error: Option<String>,
    ) -> Self {
        let total_questions = total_questions.unwrap_or(questions.len());
        let max_possible_score =
            max_possible_score.unwrap_or_else(|| questions.iter().map(|q| q.max_score).sum());
        Self {
            questions,
            total_questions,
            max_possible_score,
            error,
        }
    }
}

/// Answer key as the model returns it, with questions not yet read.
#[derive(Deserialize)]
pub(crate) struct RawAnswerKey {
    #[serde(default, deserialize_with = "lenient::entries")]
    questions: Vec<Value>,
    #[serde(default)]
    total_questions: Option<usize>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    max_possible_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    error: Option<String>,
}

impl RawAnswerKey {
    /// Builds the key from the readable questions and reports the ones dropped.
    /// Totals reported by the model are kept only when nothing was dropped.
    pub(crate) fn into_key(self) -> (AnswerKey, Vec<String>) {
        let (questions, skipped) = lenient::read_entries(self.questions, "question");
        let key = if skipped.is_empty() {
            AnswerKey::assemble(
                questions,
                self.total_questions,
                self.max_possible_score,
                self.error,
            )
        } else {
            AnswerKey::assemble(questions, None, None, self.error)
        };
        (key, skipped)
    }
}

impl<'de> Deserialize<'de> for AnswerKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RawAnswerKey::deserialize(deserializer).map(|raw| raw.into_key().0)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StudentAnswer {
    #[serde(deserialize_with = "lenient::number")]
    pub number: u32,
    #[serde(default)]
    pub student_answer: String,
}

impl StudentAnswer {
    pub fn new(number: u32, student_answer: impl Into<String>) -> Self {
        Self {
            number,
            student_answer: student_answer.into(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct StudentAnswers {
    #[serde(default, deserialize_with = "lenient::readable_entries")]
    pub answers: Vec<StudentAnswer>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EvaluationResult {
    pub score: f64,
    pub feedback: String,
    pub is_correct: bool,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// One graded question: the key and answer it was graded from plus the result.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct QuestionEvaluation {
    pub question_number: u32,
    pub question_text: String,
    pub expected_answer: String,
    pub student_answer: String,
    pub max_score: f64,
    #[serde(flatten)]
    pub result: EvaluationResult,
}

impl QuestionEvaluation {
    pub fn new(question: &AnswerKeyQuestion, answer: &StudentAnswer, result: EvaluationResult) -> Self {
        Self {
            question_number: question.number,
            question_text: question.question_text.clone(),
            expected_answer: question.expected_answer.clone(),
            student_answer: answer.student_answer.clone(),
            max_score: question.max_score,
            result,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct QualityVerdict {
    #[serde(default = "default_true", deserialize_with = "lenient::acceptable")]
    pub is_acceptable: bool,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub issues: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_corrections: Option<Value>,
    #[serde(
        default = "default_verdict_confidence",
        deserialize_with = "lenient::verdict_confidence"
    )]
    pub confidence: f64,
}

impl QualityVerdict {
    /// Verdict used when the audit itself fails. Audits fail open.
    pub fn fail_open() -> Self {
        Self {
            is_acceptable: true,
            issues: Vec::new(),
            suggested_corrections: None,
            confidence: 0.5,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct QualityCheckRecord {
    pub question_number: u32,
    /// Evaluation pass the verdict belongs to, starting at 0.
    pub attempt: u32,
    pub result: QualityVerdict,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PerformanceAnalysis {
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub strengths: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub weaknesses: Vec<String>,
    #[serde(
        default = "default_analysis_confidence",
        deserialize_with = "lenient::analysis_confidence"
    )]
    pub confidence: f64,
}

/// Condensed per-question row fed to the analysis and chat prompts.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct QuestionSummary {
    #[serde(alias = "number", deserialize_with = "lenient::number")]
    pub question_number: u32,
    #[serde(default)]
    pub score: f64,
    #[serde(default = "default_max_score")]
    pub max_score: f64,
    #[serde(default)]
    pub is_correct: bool,
    #[serde(default)]
    pub feedback: String,
}

impl From<&QuestionEvaluation> for QuestionSummary {
    fn from(evaluation: &QuestionEvaluation) -> Self {
        Self {
            question_number: evaluation.question_number,
            score: evaluation.result.score,
            max_score: evaluation.max_score,
            is_correct: evaluation.result.is_correct,
            feedback: evaluation.result.feedback.clone(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct EvaluationOutput {
    pub evaluations: Vec<QuestionEvaluation>,
    pub needs_review: bool,
    pub avg_confidence: f64,
    pub retry_count: u32,
}

impl EvaluationOutput {
    pub fn total_score(&self) -> f64 {
        self.evaluations.iter().map(|e| e.result.score).sum()
    }
}

pub(crate) mod lenient {
    use serde::de::{DeserializeOwned, Deserializer, Error};
    use serde::Deserialize;
    use serde_json::Value;

    fn as_f64(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Question numbers: `3`, `3.0`, `"3"`, `"3."` and `"3)"` all read as 3.
    pub fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let parsed = match &value {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)),
            Value::String(s) => s.trim().trim_end_matches(['.', ')']).parse().ok(),
            _ => None,
        };
        parsed
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| D::Error::custom(format!("invalid question number: {value}")))
    }

    pub fn max_score<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(as_f64(&value).unwrap_or(super::DEFAULT_MAX_SCORE))
    }

    pub fn opt_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(as_f64(&value))
    }

    /// `true`, `"true"`, `"yes"` and their negatives; anything else is unknown.
    pub fn opt_bool<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<bool>, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::Bool(b) => Some(b),
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" => Some(true),
                "false" | "no" => Some(false),
                _ => None,
            },
            _ => None,
        })
    }

    pub fn acceptable<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        Ok(opt_bool(deserializer)?.unwrap_or_else(super::default_true))
    }

    /// Text fields: null is absent, other scalars are rendered as text.
    pub fn opt_string<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::String(s) => Some(s),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
            other => Some(other.to_string()),
        })
    }

    /// A JSON list kept as raw entries. Null reads as an empty list.
    pub fn entries<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Value>, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Array(items) => Ok(items),
            Value::Null => Ok(Vec::new()),
            other => Err(D::Error::custom(format!("expected a list, got {other}"))),
        }
    }

    /// Reads entries one at a time, keeping the readable ones and
    /// describing each entry that had to be dropped.
    pub fn read_entries<T: DeserializeOwned>(
        entries: Vec<Value>,
        kind: &str,
    ) -> (Vec<T>, Vec<String>) {
        let mut kept = Vec::with_capacity(entries.len());
        let mut skipped = Vec::new();
        for entry in entries {
            match T::deserialize(&entry) {
                Ok(item) => kept.push(item),
                Err(error) => {
                    tracing::warn!(kind, %entry, %error, "skipping unreadable entry");
                    skipped.push(format!("skipped {kind} {entry}: {error}"));
                }
            }
        }
        (kept, skipped)
    }

    pub fn readable_entries<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let entries = entries(deserializer)?;
        Ok(read_entries(entries, "entry").0)
    }

    pub fn verdict_confidence<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(as_f64(&value).map_or(super::default_verdict_confidence(), |c| c.clamp(0.0, 1.0)))
    }

    pub fn analysis_confidence<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<f64, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(as_f64(&value).map_or(super::default_analysis_confidence(), |c| c.clamp(0.0, 1.0)))
    }

    /// A list of strings; a comma separated string is split, anything else is empty.
    pub fn string_list<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<String>, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    Value::Null => None,
                    other => Some(other.to_string()),
                })
                .collect(),
            Value::String(s) => s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        })
    }
}
