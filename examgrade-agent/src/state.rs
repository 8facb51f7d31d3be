use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use examgrade_core::{GradeError, Value};
use serde::{Deserialize, Serialize};
use serde_json::Map;

use crate::models::{
    AnswerKey, PerformanceAnalysis, QualityCheckRecord, QuestionEvaluation, QuestionSummary,
    StudentAnswers,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    ParseAnswerKey,
    ParseStudent,
    Evaluate,
    Analyze,
}

impl TaskKind {
    pub const ALL: [TaskKind; 4] = [
        TaskKind::ParseAnswerKey,
        TaskKind::ParseStudent,
        TaskKind::Evaluate,
        TaskKind::Analyze,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::ParseAnswerKey => "parse_answer_key",
            TaskKind::ParseStudent => "parse_student",
            TaskKind::Evaluate => "evaluate",
            TaskKind::Analyze => "analyze",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = GradeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| GradeError::Workflow(format!("Unknown task: {s}")))
    }
}

/// Payload for one run, one variant per task.
#[derive(Clone, Debug, PartialEq)]
pub enum TaskInput {
    ParseAnswerKey {
        text: String,
    },
    ParseStudent {
        text: String,
        question_count: usize,
    },
    Evaluate {
        answer_key: AnswerKey,
        student_answers: StudentAnswers,
    },
    Analyze {
        student_name: String,
        total_score: f64,
        max_score: f64,
        percentage: f64,
        questions: Vec<QuestionSummary>,
    },
}

impl TaskInput {
    pub fn kind(&self) -> TaskKind {
        match self {
            TaskInput::ParseAnswerKey { .. } => TaskKind::ParseAnswerKey,
            TaskInput::ParseStudent { .. } => TaskKind::ParseStudent,
            TaskInput::Evaluate { .. } => TaskKind::Evaluate,
            TaskInput::Analyze { .. } => TaskKind::Analyze,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Processing,
    QualityCheck,
    Completed,
    Failed,
}

impl Status {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Completed | Status::Failed)
    }
}

/// One timed tool invocation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToolCallLog {
    pub tool: String,
    pub duration_seconds: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answers_found: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_acceptable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degraded: Option<String>,
}

impl ToolCallLog {
    pub fn new(tool: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            tool: tool.into(),
            duration_seconds: (elapsed.as_secs_f64() * 100.0).round() / 100.0,
            timestamp: Utc::now(),
            question_number: None,
            question_count: None,
            answers_found: None,
            confidence: None,
            success: None,
            is_acceptable: None,
            degraded: None,
        }
    }

    pub fn question_number(mut self, number: u32) -> Self {
        self.question_number = Some(number);
        self
    }

    pub fn question_count(mut self, count: usize) -> Self {
        self.question_count = Some(count);
        self
    }

    pub fn answers_found(mut self, count: usize) -> Self {
        self.answers_found = Some(count);
        self
    }

    pub fn confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn success(mut self, success: bool) -> Self {
        self.success = Some(success);
        self
    }

    pub fn is_acceptable(mut self, acceptable: bool) -> Self {
        self.is_acceptable = Some(acceptable);
        self
    }

    /// Records why the tool fell back to its degraded result.
    pub fn degraded(mut self, reason: Option<&str>) -> Self {
        self.degraded = reason.map(str::to_string);
        self
    }
}

/// Append-only record of what a run thought, did and saw.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct AuditTrail {
    pub thoughts: Vec<String>,
    pub actions: Vec<String>,
    pub observations: Vec<String>,
    pub tool_calls: Vec<ToolCallLog>,
}

impl AuditTrail {
    pub fn think(&mut self, thought: impl Into<String>, action: impl Into<String>) {
        self.thoughts.push(thought.into());
        self.actions.push(action.into());
    }

    pub fn observe(&mut self, observation: impl Into<String>) {
        self.observations.push(observation.into());
    }

    pub fn log_call(&mut self, log: ToolCallLog) {
        self.tool_calls.push(log);
    }
}

/// Partial outputs keyed by the stage that produced them.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct TaskResults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_key: Option<AnswerKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_answers: Option<StudentAnswers>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluations: Option<Vec<QuestionEvaluation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<PerformanceAnalysis>,
}

/// State threaded through every node of one run.
///
/// Created fresh per run and owned by it. Once the status is terminal the
/// state refuses further status, output and retry changes.
#[derive(Clone, Debug)]
pub struct WorkflowState {
    task: TaskKind,
    input: TaskInput,
    context: Map<String, Value>,
    pub(crate) trail: AuditTrail,
    pub(crate) results: TaskResults,
    pub(crate) quality_checks: Vec<QualityCheckRecord>,
    retry_count: u32,
    pub(crate) needs_review: bool,
    pub(crate) confidence_scores: Vec<f64>,
    status: Status,
    final_output: Option<Value>,
    error: Option<String>,
}

impl WorkflowState {
    pub fn new(task: TaskKind, input: TaskInput) -> Self {
        Self {
            task,
            input,
            context: Map::new(),
            trail: AuditTrail::default(),
            results: TaskResults::default(),
            quality_checks: Vec::new(),
            retry_count: 0,
            needs_review: false,
            confidence_scores: Vec::new(),
            status: Status::Processing,
            final_output: None,
            error: None,
        }
    }

    /// State for `input`'s own task kind.
    pub fn for_input(input: TaskInput) -> Self {
        Self::new(input.kind(), input)
    }

    /// Attaches caller metadata that is echoed in the trace.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn task(&self) -> TaskKind {
        self.task
    }

    pub fn input(&self) -> &TaskInput {
        &self.input
    }

    pub fn context(&self) -> &Map<String, Value> {
        &self.context
    }

    pub fn trail(&self) -> &AuditTrail {
        &self.trail
    }

    pub fn results(&self) -> &TaskResults {
        &self.results
    }

    pub fn quality_checks(&self) -> &[QualityCheckRecord] {
        &self.quality_checks
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn needs_review(&self) -> bool {
        self.needs_review
    }

    pub fn confidence_scores(&self) -> &[f64] {
        &self.confidence_scores
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn final_output(&self) -> Option<&Value> {
        self.final_output.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Moves to a non-terminal status. Ignored once the run is terminal.
    pub fn set_status(&mut self, status: Status) {
        if self.status.is_terminal() {
            return;
        }
        self.status = status;
    }

    /// Stores the output the current pass produced without ending the run.
    pub fn set_output(&mut self, output: Value) {
        if !self.status.is_terminal() {
            self.final_output = Some(output);
        }
    }

    pub fn finish(&mut self) {
        self.set_status(Status::Completed);
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        if self.status.is_terminal() {
            return;
        }
        let error = error.into();
        self.trail.observe(format!("Error executing task: {error}"));
        self.error = Some(error);
        self.status = Status::Failed;
    }

    /// Schedules another evaluation pass if fewer than `max_retries` were
    /// used. Returns whether a retry was granted.
    pub fn request_retry(&mut self, max_retries: u32) -> bool {
        if self.status.is_terminal() || self.retry_count >= max_retries {
            return false;
        }
        self.retry_count += 1;
        self.status = Status::Processing;
        true
    }

    pub fn trace(&self) -> AgentTrace {
        AgentTrace {
            task: self.task,
            status: self.status,
            context: self.context.clone(),
            trail: self.trail.clone(),
            quality_checks: self.quality_checks.clone(),
            retry_count: self.retry_count,
            needs_review: self.needs_review,
            confidence_scores: self.confidence_scores.clone(),
            error: self.error.clone(),
        }
    }
}

/// Audit record returned alongside every output.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AgentTrace {
    pub task: TaskKind,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub context: Map<String, Value>,
    #[serde(flatten)]
    pub trail: AuditTrail,
    pub quality_checks: Vec<QualityCheckRecord>,
    pub retry_count: u32,
    pub needs_review: bool,
    pub confidence_scores: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RunOutput {
    pub final_output: Value,
    pub trace: AgentTrace,
}
