mod common;

use std::sync::Mutex;

use common::{answer_key, evaluation_json, tool_of, verdict_json, FakeLlm, Tool};
use examgrade_agent::{
    grade_student, EvaluationResult, ExamEvaluationAgent, ProgressReporter, QuestionEvaluation,
    StudentAnswer, StudentReport,
};
use serde_json::json;

#[derive(Default)]
struct Recorder(Mutex<Vec<(f64, String)>>);

impl ProgressReporter for Recorder {
    fn report(&self, percentage: f64, message: &str) {
        self.0.lock().unwrap().push((percentage, message.to_string()));
    }
}

fn evaluation(number: u32, score: f64, is_correct: bool) -> QuestionEvaluation {
    QuestionEvaluation::new(
        &common::question(number),
        &StudentAnswer::new(number, "cevap"),
        EvaluationResult {
            score,
            feedback: "geri bildirim".to_string(),
            is_correct,
            confidence: 0.9,
            reasoning: None,
        },
    )
}

#[test]
fn report_totals_against_answer_key_maximum() {
    let report = StudentReport::from_evaluations(
        "Ali",
        vec![evaluation(1, 8.0, true), evaluation(3, 4.0, false)],
        30.0,
    );

    assert_eq!(report.total_score, 12.0);
    assert_eq!(report.max_score, 30.0);
    assert!((report.percentage - 40.0).abs() < 1e-9);
    assert_eq!(report.correct_count, 1);
    assert_eq!(report.question_count, 2);
    assert_eq!(report.question_summaries()[1].question_number, 3);
}

#[test]
fn zero_maximum_gives_zero_percentage() {
    let report = StudentReport::from_evaluations("Ali", Vec::new(), 0.0);
    assert_eq!(report.percentage, 0.0);
    assert_eq!(report.total_score, 0.0);
}

#[tokio::test]
async fn grade_student_runs_every_step() {
    let llm = FakeLlm::new(|request| match tool_of(request) {
        Tool::ParseStudent => Ok(json!({"answers": [
            {"number": 1, "student_answer": "a"},
            {"number": 2, "student_answer": "b"}
        ]})
        .to_string()),
        Tool::Evaluate => Ok(evaluation_json(7.0, 0.9)),
        Tool::QualityCheck => Ok(verdict_json(true)),
        Tool::Analyze => Ok(json!({"strengths": ["Tanımları biliyor"], "weaknesses": ["Örnek vermiyor"], "confidence": 0.75}).to_string()),
        other => panic!("unexpected {other:?} call"),
    });
    let agent = ExamEvaluationAgent::new(llm.clone(), common::test_config()).unwrap();
    let progress = Recorder::default();

    let report = grade_student(&agent, &answer_key(3), "Ayşe", "cevap kağıdı", &progress)
        .await
        .unwrap();

    assert_eq!(report.student_name, "Ayşe");
    assert_eq!(report.question_count, 2);
    assert_eq!(report.total_score, 14.0);
    assert_eq!(report.max_score, 30.0);
    assert_eq!(report.correct_count, 2);
    assert!(!report.needs_review);
    assert_eq!(report.analysis.unwrap().strengths, vec!["Tanımları biliyor"]);

    let parse = &llm.requests()[0];
    assert!(parse.messages[0]
        .content
        .contains("EXPECTED NUMBER OF QUESTIONS: 3"));

    let steps: Vec<f64> = progress.0.lock().unwrap().iter().map(|(p, _)| *p).collect();
    assert_eq!(steps, vec![10.0, 30.0, 80.0, 100.0]);
}
