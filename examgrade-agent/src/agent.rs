use std::sync::Arc;

use examgrade_core::{ChatLlm, GradeError, Value};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::config::AgentConfig;
use crate::models::{
    AnswerKey, EvaluationOutput, PerformanceAnalysis, QuestionSummary, StudentAnswer,
    StudentAnswers,
};
use crate::state::{AgentTrace, RunOutput, Status, TaskInput, TaskKind, WorkflowState};
use crate::tools::{ChatRequest, ExamTools};
use crate::workflow::{build_exam_graph, ExamGraph};

/// Question count assumed when a caller does not send one.
const DEFAULT_QUESTION_COUNT: usize = 5;

/// A typed result together with the audit trace of the run that made it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Traced<T> {
    pub output: T,
    pub trace: AgentTrace,
}

/// Drives the reasoning / execution / quality-check workflow.
///
/// Each run gets its own [`WorkflowState`]; the agent itself holds no
/// per-run data, so one agent can serve concurrent runs.
pub struct ExamEvaluationAgent {
    tools: Arc<ExamTools>,
    graph: ExamGraph,
}

impl ExamEvaluationAgent {
    pub fn new(llm: Arc<dyn ChatLlm>, config: AgentConfig) -> Result<Self, GradeError> {
        config.validate()?;
        let tools = Arc::new(ExamTools::new(llm, config));
        let graph = build_exam_graph(tools.clone())?;
        Ok(Self { tools, graph })
    }

    pub fn tools(&self) -> &ExamTools {
        &self.tools
    }

    pub fn config(&self) -> &AgentConfig {
        self.tools.config()
    }

    /// Runs `task` to a terminal status. A failed run is returned as an error.
    pub async fn run(&self, task: TaskKind, input: TaskInput) -> Result<RunOutput, GradeError> {
        self.run_state(WorkflowState::new(task, input)).await
    }

    pub async fn run_state(&self, state: WorkflowState) -> Result<RunOutput, GradeError> {
        let task = state.task();
        let span = tracing::info_span!("exam_workflow", task = %task);
        let state = self.graph.invoke(state).instrument(span).await?;

        match state.status() {
            Status::Completed => Ok(RunOutput {
                final_output: state.final_output().cloned().unwrap_or(Value::Null),
                trace: state.trace(),
            }),
            Status::Failed => Err(GradeError::Workflow(format!(
                "Failed to {}: {}",
                failure_subject(task),
                state.error().unwrap_or("unknown error")
            ))),
            status => Err(GradeError::Workflow(format!(
                "Workflow for {task} stopped in non-terminal status {status:?}"
            ))),
        }
    }

    /// Runs a task named by its wire string with loosely shaped input:
    /// parse tasks take the text as `payload`, evaluate and analyze read
    /// their data from `context`.
    pub async fn run_json(
        &self,
        task: &str,
        payload: Value,
        context: Value,
    ) -> Result<RunOutput, GradeError> {
        let task: TaskKind = task.parse()?;
        let input = input_from_json(task, payload, context)?;
        self.run(task, input).await
    }

    pub async fn parse_answer_key(&self, text: &str) -> Result<Traced<AnswerKey>, GradeError> {
        let input = TaskInput::ParseAnswerKey {
            text: text.to_string(),
        };
        typed(self.run(TaskKind::ParseAnswerKey, input).await?)
    }

    pub async fn parse_student_answer(
        &self,
        text: &str,
        question_count: usize,
    ) -> Result<Traced<StudentAnswers>, GradeError> {
        let input = TaskInput::ParseStudent {
            text: text.to_string(),
            question_count,
        };
        typed(self.run(TaskKind::ParseStudent, input).await?)
    }

    pub async fn evaluate_student(
        &self,
        answer_key: &AnswerKey,
        student_answers: &StudentAnswers,
    ) -> Result<Traced<EvaluationOutput>, GradeError> {
        let input = TaskInput::Evaluate {
            answer_key: answer_key.clone(),
            student_answers: student_answers.clone(),
        };
        typed(self.run(TaskKind::Evaluate, input).await?)
    }

    pub async fn analyze_student_performance(
        &self,
        student_name: &str,
        total_score: f64,
        max_score: f64,
        percentage: f64,
        questions: &[QuestionSummary],
    ) -> Result<Traced<PerformanceAnalysis>, GradeError> {
        let input = TaskInput::Analyze {
            student_name: student_name.to_string(),
            total_score,
            max_score,
            percentage,
            questions: questions.to_vec(),
        };
        typed(self.run(TaskKind::Analyze, input).await?)
    }

    /// Single completion outside the workflow; never fails.
    pub async fn chat_about_student(&self, request: &ChatRequest) -> String {
        self.tools.chat_about_student(request).await.into_value()
    }
}

fn failure_subject(task: TaskKind) -> &'static str {
    match task {
        TaskKind::ParseAnswerKey => "parse answer key",
        TaskKind::ParseStudent => "parse student answer",
        TaskKind::Evaluate => "evaluate student",
        TaskKind::Analyze => "analyze performance",
    }
}

fn typed<T: DeserializeOwned>(run: RunOutput) -> Result<Traced<T>, GradeError> {
    Ok(Traced {
        output: serde_json::from_value(run.final_output)?,
        trace: run.trace,
    })
}

fn field<T: DeserializeOwned>(context: &Value, key: &str, default: T) -> Result<T, GradeError> {
    match context.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(value) => Ok(T::deserialize(value)?),
    }
}

fn text_payload(task: TaskKind, payload: Value) -> Result<String, GradeError> {
    match payload {
        Value::String(text) => Ok(text),
        other => Err(GradeError::Workflow(format!(
            "Task {task} expects a text payload, got {other}"
        ))),
    }
}

/// Student answers arrive either as a bare list or wrapped in `answers`.
fn student_answers(context: &Value) -> Result<StudentAnswers, GradeError> {
    match context.get("student_answers") {
        None | Some(Value::Null) => Ok(StudentAnswers::default()),
        Some(Value::Array(items)) => Ok(StudentAnswers {
            answers: items
                .iter()
                .map(StudentAnswer::deserialize)
                .collect::<Result<_, _>>()?,
        }),
        Some(value) => Ok(StudentAnswers::deserialize(value)?),
    }
}

fn input_from_json(task: TaskKind, payload: Value, context: Value) -> Result<TaskInput, GradeError> {
    Ok(match task {
        TaskKind::ParseAnswerKey => TaskInput::ParseAnswerKey {
            text: text_payload(task, payload)?,
        },
        TaskKind::ParseStudent => TaskInput::ParseStudent {
            text: text_payload(task, payload)?,
            question_count: field(&context, "question_count", DEFAULT_QUESTION_COUNT)?,
        },
        TaskKind::Evaluate => TaskInput::Evaluate {
            answer_key: field(&context, "answer_key", AnswerKey::default())?,
            student_answers: student_answers(&context)?,
        },
        TaskKind::Analyze => TaskInput::Analyze {
            student_name: field(&context, "student_name", "Unknown".to_string())?,
            total_score: field(&context, "total_score", 0.0)?,
            max_score: field(&context, "max_score", 100.0)?,
            percentage: field(&context, "percentage", 0.0)?,
            questions: field(&context, "questions_data", Vec::new())?,
        },
    })
}
