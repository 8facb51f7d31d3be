//! Per-student grading on top of the agent: totals, percentage and the
//! parse -> evaluate -> analyze sequence.

use examgrade_core::GradeError;
use serde::{Deserialize, Serialize};

use crate::agent::ExamEvaluationAgent;
use crate::models::{AnswerKey, PerformanceAnalysis, QuestionEvaluation, QuestionSummary};

/// Receives `(percentage, message)` updates while a student is graded.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, percentage: f64, message: &str);
}

/// Discards every update.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _percentage: f64, _message: &str) {}
}

/// Logs updates as `tracing` events.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingProgress;

impl ProgressReporter for TracingProgress {
    fn report(&self, percentage: f64, message: &str) {
        tracing::info!(percentage, message, "progress");
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StudentReport {
    pub student_name: String,
    pub total_score: f64,
    pub max_score: f64,
    pub percentage: f64,
    pub correct_count: usize,
    pub question_count: usize,
    pub needs_review: bool,
    pub avg_confidence: f64,
    pub retry_count: u32,
    pub evaluations: Vec<QuestionEvaluation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<PerformanceAnalysis>,
}

impl StudentReport {
    /// Totals `evaluations` against the answer key's `max_possible_score`.
    /// Questions the student never answered count toward the maximum only.
    pub fn from_evaluations(
        student_name: impl Into<String>,
        evaluations: Vec<QuestionEvaluation>,
        max_possible_score: f64,
    ) -> Self {
        let total_score: f64 = evaluations.iter().map(|e| e.result.score).sum();
        let percentage = if max_possible_score > 0.0 {
            total_score / max_possible_score * 100.0
        } else {
            0.0
        };
        Self {
            student_name: student_name.into(),
            total_score,
            max_score: max_possible_score,
            percentage,
            correct_count: evaluations.iter().filter(|e| e.result.is_correct).count(),
            question_count: evaluations.len(),
            needs_review: false,
            avg_confidence: 0.0,
            retry_count: 0,
            evaluations,
            analysis: None,
        }
    }

    /// Rows fed to the analysis and chat prompts.
    pub fn question_summaries(&self) -> Vec<QuestionSummary> {
        self.evaluations.iter().map(QuestionSummary::from).collect()
    }
}

/// Parses, evaluates and analyzes one student's answer sheet in sequence.
pub async fn grade_student(
    agent: &ExamEvaluationAgent,
    answer_key: &AnswerKey,
    student_name: &str,
    answer_sheet: &str,
    progress: &dyn ProgressReporter,
) -> Result<StudentReport, GradeError> {
    progress.report(10.0, "Öğrenci cevapları okunuyor");
    let answers = agent
        .parse_student_answer(answer_sheet, answer_key.questions.len())
        .await?
        .output;

    progress.report(30.0, "Cevaplar değerlendiriliyor");
    let evaluated = agent.evaluate_student(answer_key, &answers).await?.output;

    let mut report = StudentReport::from_evaluations(
        student_name,
        evaluated.evaluations,
        answer_key.max_possible_score,
    );
    report.needs_review = evaluated.needs_review;
    report.avg_confidence = evaluated.avg_confidence;
    report.retry_count = evaluated.retry_count;

    progress.report(80.0, "Performans analiz ediliyor");
    let analysis = agent
        .analyze_student_performance(
            &report.student_name,
            report.total_score,
            report.max_score,
            report.percentage,
            &report.question_summaries(),
        )
        .await?
        .output;
    report.analysis = Some(analysis);

    progress.report(100.0, "Değerlendirme tamamlandı");
    tracing::info!(
        student = %report.student_name,
        total_score = report.total_score,
        percentage = report.percentage,
        needs_review = report.needs_review,
        "student graded"
    );
    Ok(report)
}
