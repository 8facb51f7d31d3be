use std::sync::Arc;
use std::time::Instant;

use examgrade_core::GradeError;
use examgrade_graph::GraphNode;

use crate::models::{
    AnswerKey, EvaluationOutput, QualityCheckRecord, QuestionEvaluation, QuestionSummary,
    StudentAnswers,
};
use crate::state::{Status, TaskInput, TaskKind, ToolCallLog, WorkflowState};
use crate::tools::{
    questions_summary, ExamTools, ANALYZE_TOOL, EVALUATE_TOOL, PARSE_ANSWER_KEY_TOOL,
    PARSE_STUDENT_TOOL, QUALITY_CHECK_TOOL,
};

/// Records which tool the run is about to use. Never calls a tool itself.
pub struct ReasoningNode;

#[async_trait::async_trait]
impl GraphNode<WorkflowState> for ReasoningNode {
    async fn run(&self, mut state: WorkflowState) -> Result<WorkflowState, GradeError> {
        let (thought, action) = match (state.task(), state.input()) {
            (TaskKind::ParseAnswerKey, _) => (
                "I need to parse the answer key to extract questions and expected answers."
                    .to_string(),
                "use parse_answer_key_tool",
            ),
            (TaskKind::ParseStudent, input) => {
                let expected = match input {
                    TaskInput::ParseStudent { question_count, .. } => question_count.to_string(),
                    _ => "unknown".to_string(),
                };
                (
                    format!("I need to parse the student answer sheet. Expected {expected} questions."),
                    "use parse_student_answer_tool",
                )
            }
            (TaskKind::Evaluate, _) if state.retry_count() > 0 => (
                format!(
                    "Previous evaluation had quality issues. Retrying with corrections (attempt {}).",
                    state.retry_count() + 1
                ),
                "use evaluate_answer_tool for each question",
            ),
            (TaskKind::Evaluate, _) => (
                "I need to evaluate each student answer against the answer key.".to_string(),
                "use evaluate_answer_tool for each question",
            ),
            (TaskKind::Analyze, _) => (
                "I need to analyze overall performance and identify strengths and weaknesses."
                    .to_string(),
                "use analyze_performance_tool",
            ),
        };
        tracing::debug!(task = %state.task(), %thought, "reasoning");
        state.trail.think(thought, action);
        Ok(state)
    }
}

/// Runs the tool(s) for the task and stores what they produced.
pub struct ExecutionNode {
    tools: Arc<ExamTools>,
}

impl ExecutionNode {
    pub fn new(tools: Arc<ExamTools>) -> Self {
        Self { tools }
    }

    async fn parse_answer_key(
        &self,
        state: &mut WorkflowState,
        text: &str,
    ) -> Result<(), GradeError> {
        let started = Instant::now();
        let output = self.tools.parse_answer_key(text).await;
        state.trail.log_call(
            ToolCallLog::new(PARSE_ANSWER_KEY_TOOL, started.elapsed())
                .success(!output.is_degraded())
                .degraded(output.reason()),
        );
        let key = output.into_value();
        state.trail.observe(format!(
            "Successfully parsed {} questions from answer key",
            key.total_questions
        ));
        state.set_output(serde_json::to_value(&key)?);
        state.results.answer_key = Some(key);
        state.finish();
        Ok(())
    }

    async fn parse_student(
        &self,
        state: &mut WorkflowState,
        text: &str,
        question_count: usize,
    ) -> Result<(), GradeError> {
        let started = Instant::now();
        let output = self.tools.parse_student_answers(text, question_count).await;
        state.trail.log_call(
            ToolCallLog::new(PARSE_STUDENT_TOOL, started.elapsed())
                .question_count(question_count)
                .answers_found(output.value().answers.len())
                .degraded(output.reason()),
        );
        let answers = output.into_value();
        state.trail.observe(format!(
            "Successfully parsed {} student answers",
            answers.answers.len()
        ));
        state.set_output(serde_json::to_value(&answers)?);
        state.results.student_answers = Some(answers);
        state.finish();
        Ok(())
    }

    /// One full evaluation pass. A retry re-runs every question from scratch.
    async fn evaluate(
        &self,
        state: &mut WorkflowState,
        answer_key: &AnswerKey,
        student_answers: &StudentAnswers,
    ) -> Result<(), GradeError> {
        let policy = &self.tools.config().review;
        state.confidence_scores.clear();
        let mut evaluations = Vec::new();
        for question in &answer_key.questions {
            let Some(answer) = student_answers
                .answers
                .iter()
                .find(|answer| answer.number == question.number)
            else {
                continue;
            };

            let started = Instant::now();
            let output = self
                .tools
                .evaluate_answer(question, &answer.student_answer)
                .await;
            state.trail.log_call(
                ToolCallLog::new(EVALUATE_TOOL, started.elapsed())
                    .question_number(question.number)
                    .confidence(output.value().confidence)
                    .degraded(output.reason()),
            );
            let result = output.into_value();
            state.confidence_scores.push(result.confidence);
            evaluations.push(QuestionEvaluation::new(question, answer, result));
        }

        let avg_confidence = policy.average_confidence(&state.confidence_scores);
        state.needs_review = policy.needs_review(&state.confidence_scores);
        if state.needs_review {
            state.trail.observe(format!(
                "Low confidence detected (avg: {avg_confidence:.2}). Human review recommended."
            ));
        }
        state.trail.observe(format!(
            "Successfully evaluated {} questions. Avg confidence: {avg_confidence:.2}",
            evaluations.len()
        ));
        tracing::info!(
            evaluated = evaluations.len(),
            avg_confidence,
            needs_review = state.needs_review,
            retry = state.retry_count(),
            "evaluation pass finished"
        );
        state.results.evaluations = Some(evaluations);
        publish_evaluations(state, &self.tools)?;
        state.set_status(Status::QualityCheck);
        Ok(())
    }

    async fn analyze(
        &self,
        state: &mut WorkflowState,
        student_name: &str,
        total_score: f64,
        max_score: f64,
        percentage: f64,
        questions: &[QuestionSummary],
    ) -> Result<(), GradeError> {
        let summary = questions_summary(questions);
        let started = Instant::now();
        let output = self
            .tools
            .analyze_performance(student_name, total_score, max_score, percentage, &summary)
            .await;
        state.trail.log_call(
            ToolCallLog::new(ANALYZE_TOOL, started.elapsed())
                .confidence(output.value().confidence)
                .degraded(output.reason()),
        );
        let analysis = output.into_value();
        state.confidence_scores.push(analysis.confidence);
        state
            .trail
            .observe("Successfully analyzed student performance");
        state.set_output(serde_json::to_value(&analysis)?);
        state.results.analysis = Some(analysis);
        state.finish();
        Ok(())
    }
}

#[async_trait::async_trait]
impl GraphNode<WorkflowState> for ExecutionNode {
    async fn run(&self, mut state: WorkflowState) -> Result<WorkflowState, GradeError> {
        let input = state.input().clone();
        let outcome = match (state.task(), &input) {
            (TaskKind::ParseAnswerKey, TaskInput::ParseAnswerKey { text }) => {
                self.parse_answer_key(&mut state, text).await
            }
            (
                TaskKind::ParseStudent,
                TaskInput::ParseStudent {
                    text,
                    question_count,
                },
            ) => self.parse_student(&mut state, text, *question_count).await,
            (
                TaskKind::Evaluate,
                TaskInput::Evaluate {
                    answer_key,
                    student_answers,
                },
            ) => self.evaluate(&mut state, answer_key, student_answers).await,
            (
                TaskKind::Analyze,
                TaskInput::Analyze {
                    student_name,
                    total_score,
                    max_score,
                    percentage,
                    questions,
                },
            ) => {
                self.analyze(
                    &mut state,
                    student_name,
                    *total_score,
                    *max_score,
                    *percentage,
                    questions,
                )
                .await
            }
            (task, input) => Err(GradeError::Workflow(format!(
                "Task {task} cannot run with {} input",
                input.kind()
            ))),
        };
        if let Err(error) = outcome {
            tracing::error!(task = %state.task(), error = %error, "tool execution failed");
            state.fail(error.to_string());
        }
        Ok(state)
    }
}

/// Audits every evaluation of the last pass and requests a retry when any
/// of them is rejected.
pub struct QualityCheckNode {
    tools: Arc<ExamTools>,
}

impl QualityCheckNode {
    pub fn new(tools: Arc<ExamTools>) -> Self {
        Self { tools }
    }

    async fn check(&self, mut state: WorkflowState) -> Result<WorkflowState, GradeError> {
        let max_retries = self.tools.config().review.max_retries;
        let evaluations = state.results.evaluations.clone().unwrap_or_default();
        let retry_count = state.retry_count();

        if evaluations.is_empty() || retry_count >= max_retries {
            if !evaluations.is_empty() && retry_count > 0 {
                // Earlier passes were rejected and this one goes unaudited.
                state.needs_review = true;
                state.trail.observe(format!(
                    "Quality issues persisted for {retry_count} retries. Proceeding with current results."
                ));
            } else {
                state
                    .trail
                    .observe("Quality check skipped (no evaluations or max retries reached)");
            }
            publish_evaluations(&mut state, &self.tools)?;
            state.finish();
            return Ok(state);
        }

        let mut issues = Vec::new();
        let mut rejected = false;
        for evaluation in &evaluations {
            let started = Instant::now();
            let output = self.tools.quality_check(evaluation).await;
            state.trail.log_call(
                ToolCallLog::new(QUALITY_CHECK_TOOL, started.elapsed())
                    .question_number(evaluation.question_number)
                    .is_acceptable(output.value().is_acceptable)
                    .degraded(output.reason()),
            );
            let verdict = output.into_value();
            if !verdict.is_acceptable {
                rejected = true;
                issues.extend(verdict.issues.iter().cloned());
            }
            state.quality_checks.push(QualityCheckRecord {
                question_number: evaluation.question_number,
                attempt: retry_count,
                result: verdict,
            });
        }

        if rejected && state.request_retry(max_retries) {
            state.trail.observe(format!(
                "Quality check found issues. Retrying evaluation (attempt {}/{})",
                retry_count + 2,
                max_retries + 1
            ));
            let first: Vec<_> = issues.iter().take(3).map(String::as_str).collect();
            state
                .trail
                .observe(format!("Issues found: {}", first.join(", ")));
            tracing::info!(retry = state.retry_count(), issues = issues.len(), "quality check requested a retry");
            return Ok(state);
        }

        if rejected {
            state.needs_review = true;
            state.trail.observe(format!(
                "Quality issues persist after {max_retries} retries. Proceeding with current results."
            ));
        } else {
            state
                .trail
                .observe("Quality check passed. All evaluations are acceptable.");
        }
        publish_evaluations(&mut state, &self.tools)?;
        state.finish();
        Ok(state)
    }
}

#[async_trait::async_trait]
impl GraphNode<WorkflowState> for QualityCheckNode {
    async fn run(&self, state: WorkflowState) -> Result<WorkflowState, GradeError> {
        self.check(state).await
    }
}

/// Refreshes the evaluate output from the state's current pass.
fn publish_evaluations(state: &mut WorkflowState, tools: &ExamTools) -> Result<(), GradeError> {
    let output = EvaluationOutput {
        evaluations: state.results.evaluations.clone().unwrap_or_default(),
        needs_review: state.needs_review,
        avg_confidence: tools
            .config()
            .review
            .average_confidence(&state.confidence_scores),
        retry_count: state.retry_count(),
    };
    state.set_output(serde_json::to_value(output)?);
    Ok(())
}
