//! Agentic exam grading: LLM tools for extracting answer keys and answer
//! sheets, grading answers and analysing performance, wired into a bounded
//! reasoning / execution / quality-check workflow with self-correction.

mod agent;
mod config;
mod models;
mod nodes;
pub mod prompts;
mod report;
mod state;
mod tools;
mod workflow;

pub use agent::{ExamEvaluationAgent, Traced};
pub use config::{AgentConfig, ReviewPolicy, ToolProfiles, ToolSettings};
pub use models::{
    AnswerKey, AnswerKeyQuestion, EvaluationOutput, EvaluationResult, PerformanceAnalysis,
    QualityCheckRecord, QualityVerdict, QuestionEvaluation, QuestionSummary, StudentAnswer,
    StudentAnswers, DEFAULT_MAX_SCORE, ERROR_PARSING_ANSWER, NO_ANSWER_PROVIDED,
};
pub use nodes::{ExecutionNode, QualityCheckNode, ReasoningNode};
pub use report::{grade_student, NoProgress, ProgressReporter, StudentReport, TracingProgress};
pub use state::{
    AgentTrace, AuditTrail, RunOutput, Status, TaskInput, TaskKind, TaskResults, ToolCallLog,
    WorkflowState,
};
pub use tools::{
    chat_context, questions_summary, truncate_chars, ChatRequest, ExamTools, ToolOutput,
    ANALYZE_TOOL, CHAT_APOLOGY, CHAT_TOOL, DEFAULT_REASONING, EVALUATE_TOOL,
    PARSE_ANSWER_KEY_TOOL, PARSE_STUDENT_TOOL, QUALITY_CHECK_TOOL,
};
pub use workflow::{
    build_exam_graph, route_after_execution, route_after_quality_check, ExamGraph, Stage,
};
