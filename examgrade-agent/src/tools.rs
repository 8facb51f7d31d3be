//! The LLM-backed grading tools.
//!
//! Every tool fails soft: instead of an error it returns
//! [`ToolOutput::Degraded`] carrying a documented sentinel value, so a
//! single bad completion never blocks a student's report.

use std::sync::Arc;

use examgrade_core::{
    parse_json, retry_with_backoff, ChatLlm, GradeError, LlmRequest, Message, Role, Value,
};
use examgrade_prompt::{vars, ChatPromptTemplate, PromptVars};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::{AgentConfig, ToolSettings};
use crate::models::{
    lenient, AnswerKey, AnswerKeyQuestion, RawAnswerKey, EvaluationResult, PerformanceAnalysis, QualityVerdict,
    QuestionEvaluation, QuestionSummary, StudentAnswer, StudentAnswers, ERROR_PARSING_ANSWER,
};
use crate::prompts;

pub const PARSE_ANSWER_KEY_TOOL: &str = "parse_answer_key_tool";
pub const PARSE_STUDENT_TOOL: &str = "parse_student_answer_tool";
pub const EVALUATE_TOOL: &str = "evaluate_answer_tool";
pub const QUALITY_CHECK_TOOL: &str = "quality_check_tool";
pub const ANALYZE_TOOL: &str = "analyze_performance_tool";
pub const CHAT_TOOL: &str = "chat_about_student";

pub const CHAT_APOLOGY: &str =
    "Üzgünüm, şu anda yanıt veremiyorum. Lütfen daha sonra tekrar deneyin.";
pub const DEFAULT_REASONING: &str = "Standart değerlendirme";

const ANALYSIS_QUESTION_LIMIT: usize = 10;
const ANALYSIS_FEEDBACK_CHARS: usize = 150;
const CHAT_QUESTION_LIMIT: usize = 3;
const CHAT_FEEDBACK_CHARS: usize = 100;
const CHAT_SUMMARY_CHARS: usize = 200;
const CHAT_HISTORY_TURNS: usize = 5;

/// Result of a tool call. A degraded value is still a valid result.
#[derive(Clone, Debug, PartialEq)]
pub enum ToolOutput<T> {
    Ok(T),
    Degraded { value: T, reason: String },
}

impl<T> ToolOutput<T> {
    pub fn value(&self) -> &T {
        match self {
            ToolOutput::Ok(value) | ToolOutput::Degraded { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            ToolOutput::Ok(value) | ToolOutput::Degraded { value, .. } => value,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, ToolOutput::Degraded { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            ToolOutput::Ok(_) => None,
            ToolOutput::Degraded { reason, .. } => Some(reason),
        }
    }

    /// A partial extraction is degraded when any entry had to be dropped.
    fn partial(tool: &str, (value, skipped): (T, Vec<String>)) -> Self {
        if skipped.is_empty() {
            return ToolOutput::Ok(value);
        }
        tracing::warn!(tool, skipped = skipped.len(), "dropped unreadable entries");
        ToolOutput::Degraded {
            value,
            reason: skipped.join("; "),
        }
    }

    fn degrade(tool: &str, value: T, error: GradeError) -> Self {
        tracing::warn!(tool, error = %error, "tool failed, using fallback result");
        ToolOutput::Degraded {
            value,
            reason: error.to_string(),
        }
    }
}

/// Input for [`ExamTools::chat_about_student`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChatRequest {
    pub question: String,
    pub student_name: String,
    pub total_score: f64,
    pub max_score: f64,
    pub percentage: f64,
    pub summary: String,
    pub questions: Vec<QuestionSummary>,
    /// Earlier turns, oldest first. Only the most recent ones are sent.
    pub history: Vec<Message>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawStudentAnswers {
    Bare(Vec<Value>),
    Wrapped {
        #[serde(default, deserialize_with = "lenient::entries")]
        answers: Vec<Value>,
    },
}

impl RawStudentAnswers {
    fn into_answers(self) -> (StudentAnswers, Vec<String>) {
        let entries = match self {
            RawStudentAnswers::Wrapped { answers } | RawStudentAnswers::Bare(answers) => answers,
        };
        let (answers, skipped) = lenient::read_entries(entries, "answer");
        (StudentAnswers { answers }, skipped)
    }
}

#[derive(Deserialize)]
struct RawEvaluation {
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    score: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    feedback: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_bool")]
    is_correct: Option<bool>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    confidence: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    reasoning: Option<String>,
}

/// The grading tools, sharing one injected model client.
#[derive(Clone)]
pub struct ExamTools {
    llm: Arc<dyn ChatLlm>,
    config: AgentConfig,
}

impl ExamTools {
    pub fn new(llm: Arc<dyn ChatLlm>, config: AgentConfig) -> Self {
        Self { llm, config }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub async fn parse_answer_key(&self, text: &str) -> ToolOutput<AnswerKey> {
        let template =
            ChatPromptTemplate::new(prompts::PARSE_ANSWER_KEY_SYSTEM, prompts::PARSE_ANSWER_KEY_USER);
        let vars = vars([("text", text)]);
        match self
            .complete_json::<RawAnswerKey>(&template, &vars, &self.config.tools.parse)
            .await
        {
            Ok(raw) => ToolOutput::partial(PARSE_ANSWER_KEY_TOOL, raw.into_key()),
            Err(error) => ToolOutput::degrade(
                PARSE_ANSWER_KEY_TOOL,
                AnswerKey::degraded(error.to_string()),
                error,
            ),
        }
    }

    /// Unreadable entries are dropped. When the reply itself is unusable,
    /// returns `question_count` answers marked `[Error parsing]`.
    pub async fn parse_student_answers(
        &self,
        text: &str,
        question_count: usize,
    ) -> ToolOutput<StudentAnswers> {
        let template =
            ChatPromptTemplate::new(prompts::PARSE_STUDENT_SYSTEM, prompts::PARSE_STUDENT_USER);
        let vars = vars([
            ("text", Value::from(text)),
            ("question_count", Value::from(question_count)),
        ]);
        match self
            .complete_json::<RawStudentAnswers>(&template, &vars, &self.config.tools.parse)
            .await
        {
            Ok(raw) => ToolOutput::partial(PARSE_STUDENT_TOOL, raw.into_answers()),
            Err(error) => {
                let answers = (1..=question_count)
                    .map(|number| StudentAnswer::new(number as u32, ERROR_PARSING_ANSWER))
                    .collect();
                ToolOutput::degrade(PARSE_STUDENT_TOOL, StudentAnswers { answers }, error)
            }
        }
    }

    /// Grades one answer. Rate-limited calls are paced and retried with
    /// exponential backoff; once attempts run out the answer scores zero.
    pub async fn evaluate_answer(
        &self,
        question: &AnswerKeyQuestion,
        student_answer: &str,
    ) -> ToolOutput<EvaluationResult> {
        let backoff = &self.config.backoff;
        backoff.pace().await;
        let result = retry_with_backoff(backoff, move |_| {
            self.try_evaluate(question, student_answer)
        })
        .await;
        match result {
            Ok(result) => ToolOutput::Ok(result),
            Err(error) => {
                let value = EvaluationResult {
                    score: 0.0,
                    feedback: format!("Değerlendirme hatası: {error}"),
                    is_correct: false,
                    confidence: 0.0,
                    reasoning: Some("Hata oluştu".to_string()),
                };
                ToolOutput::degrade(EVALUATE_TOOL, value, error)
            }
        }
    }

    async fn try_evaluate(
        &self,
        question: &AnswerKeyQuestion,
        student_answer: &str,
    ) -> Result<EvaluationResult, GradeError> {
        let template = ChatPromptTemplate::new(prompts::EVALUATE_SYSTEM, prompts::EVALUATE_USER);
        let vars = vars([
            ("question_number", Value::from(question.number)),
            ("question_text", Value::from(question.question_text.as_str())),
            ("expected_answer", Value::from(question.expected_answer.as_str())),
            ("student_answer", Value::from(student_answer)),
            ("keywords", Value::from(question.keywords.join(", "))),
            ("max_score", Value::from(question.max_score)),
        ]);
        let raw: RawEvaluation = self
            .complete_json(&template, &vars, &self.config.tools.evaluate)
            .await?;
        let score = raw.score.ok_or_else(|| GradeError::ParseFailed {
            output: String::new(),
            reason: "evaluation is missing `score`".to_string(),
        })?;
        Ok(self.normalize_evaluation(raw, score, question.max_score))
    }

    fn normalize_evaluation(&self, raw: RawEvaluation, score: f64, max_score: f64) -> EvaluationResult {
        let policy = &self.config.review;
        let score = score.max(0.0).min(max_score.max(0.0));
        EvaluationResult {
            score,
            feedback: raw.feedback.unwrap_or_default(),
            is_correct: raw
                .is_correct
                .unwrap_or_else(|| policy.is_correct(score, max_score)),
            confidence: raw
                .confidence
                .map_or(policy.default_confidence, |c| c.clamp(0.0, 1.0)),
            reasoning: Some(
                raw.reasoning
                    .filter(|r| !r.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_REASONING.to_string()),
            ),
        }
    }

    /// Audits one graded answer. Audits fail open.
    pub async fn quality_check(&self, evaluation: &QuestionEvaluation) -> ToolOutput<QualityVerdict> {
        let template =
            ChatPromptTemplate::new(prompts::QUALITY_CHECK_SYSTEM, prompts::QUALITY_CHECK_USER);
        let result = &evaluation.result;
        let vars = vars([
            ("score", Value::from(result.score)),
            ("max_score", Value::from(evaluation.max_score)),
            ("feedback", Value::from(result.feedback.as_str())),
            ("confidence", Value::from(result.confidence)),
            ("reasoning", Value::from(result.reasoning.as_deref().unwrap_or("Yok"))),
        ]);
        match self
            .complete_json::<QualityVerdict>(&template, &vars, &self.config.tools.quality_check)
            .await
        {
            Ok(verdict) => ToolOutput::Ok(verdict),
            Err(error) => ToolOutput::degrade(QUALITY_CHECK_TOOL, QualityVerdict::fail_open(), error),
        }
    }

    pub async fn analyze_performance(
        &self,
        student_name: &str,
        total_score: f64,
        max_score: f64,
        percentage: f64,
        questions_summary: &str,
    ) -> ToolOutput<PerformanceAnalysis> {
        let template = ChatPromptTemplate::new(prompts::ANALYZE_SYSTEM, prompts::ANALYZE_USER);
        let vars = vars([
            ("student_name", Value::from(student_name)),
            ("total_score", Value::from(total_score)),
            ("max_score", Value::from(max_score)),
            ("percentage", Value::from(percentage)),
            ("questions_summary", Value::from(questions_summary)),
        ]);
        match self
            .complete_json::<PerformanceAnalysis>(&template, &vars, &self.config.tools.analyze)
            .await
        {
            Ok(analysis) => ToolOutput::Ok(analysis),
            Err(error) => {
                let fallback = PerformanceAnalysis {
                    strengths: vec!["Bazı sorulara doğru yanıt verdi".to_string()],
                    weaknesses: vec![
                        "Genel performans düşük, daha fazla çalışma gerekiyor".to_string()
                    ],
                    confidence: 0.5,
                };
                ToolOutput::degrade(ANALYZE_TOOL, fallback, error)
            }
        }
    }

    /// Free-text answer to a teacher's question about one student.
    pub async fn chat_about_student(&self, request: &ChatRequest) -> ToolOutput<String> {
        match self.try_chat(request).await {
            Ok(reply) => ToolOutput::Ok(reply),
            Err(error) => ToolOutput::degrade(CHAT_TOOL, CHAT_APOLOGY.to_string(), error),
        }
    }

    async fn try_chat(&self, request: &ChatRequest) -> Result<String, GradeError> {
        let system = ChatPromptTemplate::new(prompts::CHAT_SYSTEM, "{{question}}");
        let vars = vars([
            ("context", chat_context(request)),
            ("question", request.question.clone()),
        ]);
        let mut messages = system.format_messages(&vars)?;
        let question = messages.pop();
        let skip = request.history.len().saturating_sub(CHAT_HISTORY_TURNS);
        messages.extend(request.history[skip..].iter().map(|turn| match turn.role {
            Role::User => Message::user(turn.content.clone()),
            _ => Message::assistant(turn.content.clone()),
        }));
        messages.extend(question);

        let reply = self
            .complete(messages, &self.config.tools.chat, false)
            .await?;
        Ok(unwrap_json_reply(&reply))
    }

    async fn complete_json<T: DeserializeOwned>(
        &self,
        template: &ChatPromptTemplate,
        vars: &PromptVars,
        settings: &ToolSettings,
    ) -> Result<T, GradeError> {
        let messages = template.format_messages(vars)?;
        let raw = self.complete(messages, settings, true).await?;
        parse_json(&raw)
    }

    async fn complete(
        &self,
        messages: Vec<Message>,
        settings: &ToolSettings,
        json_response: bool,
    ) -> Result<String, GradeError> {
        let request = LlmRequest {
            model: self.config.model.clone(),
            messages,
            temperature: Some(settings.temperature),
            max_output_tokens: Some(settings.max_output_tokens),
            json_response,
        };
        Ok(self.llm.complete(request).await?.content)
    }
}

/// Cuts `text` to at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

fn verdict(is_correct: bool) -> &'static str {
    if is_correct {
        "Doğru"
    } else {
        "Yanlış"
    }
}

/// The condensed per-question text handed to the analysis prompt.
pub fn questions_summary(questions: &[QuestionSummary]) -> String {
    questions
        .iter()
        .take(ANALYSIS_QUESTION_LIMIT)
        .map(|q| {
            format!(
                "Soru {}: {:.1}/{:.1} - {}\nFeedback: {}...",
                q.question_number,
                q.score,
                q.max_score,
                verdict(q.is_correct),
                truncate_chars(&q.feedback, ANALYSIS_FEEDBACK_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The context block of the chat prompt.
pub fn chat_context(request: &ChatRequest) -> String {
    let summary = if request.summary.is_empty() {
        "Yok"
    } else {
        truncate_chars(&request.summary, CHAT_SUMMARY_CHARS)
    };
    let mut parts = vec![
        format!("ÖĞRENCİ: {}", request.student_name),
        format!(
            "PUAN: {:.1}/{:.1} (%{:.1})",
            request.total_score, request.max_score, request.percentage
        ),
        format!("ÖZET: {summary}"),
        format!("\nSORULAR (toplam {}):", request.questions.len()),
    ];
    parts.extend(request.questions.iter().take(CHAT_QUESTION_LIMIT).map(|q| {
        format!(
            "Q{}: Puan {:.1}/{:.1} - {}\nFeedback: {}...",
            q.question_number,
            q.score,
            q.max_score,
            verdict(q.is_correct),
            truncate_chars(&q.feedback, CHAT_FEEDBACK_CHARS)
        )
    }));
    parts.join("\n")
}

/// Models sometimes answer the chat prompt with a JSON object anyway.
fn unwrap_json_reply(reply: &str) -> String {
    let trimmed = reply.trim();
    if trimmed.starts_with('{') {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed) {
            for key in ["durumu", "yanit"] {
                if let Some(Value::String(text)) = map.get(key) {
                    if !text.is_empty() {
                        return text.clone();
                    }
                }
            }
            return map
                .values()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(" ");
        }
    }
    trimmed.to_string()
}
