use std::fmt;
use std::sync::Arc;

use examgrade_graph::{
    ExecutableGraph, ExecutionConfig, GraphBuilder, GraphError, Next, TracingObserver,
};

use crate::nodes::{ExecutionNode, QualityCheckNode, ReasoningNode};
use crate::state::{Status, TaskKind, WorkflowState};
use crate::tools::ExamTools;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    Reasoning,
    ToolExecution,
    QualityCheck,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Reasoning => "reasoning",
            Stage::ToolExecution => "tool_execution",
            Stage::QualityCheck => "quality_check",
        })
    }
}

pub type ExamGraph = ExecutableGraph<WorkflowState, Stage>;

/// Only evaluation results are audited.
pub fn route_after_execution(state: &WorkflowState) -> Next<Stage> {
    if state.status() == Status::QualityCheck && state.task() == TaskKind::Evaluate {
        Next::Node(Stage::QualityCheck)
    } else {
        Next::End
    }
}

/// Loops back to reasoning only when the quality check just granted a retry.
pub fn route_after_quality_check(state: &WorkflowState) -> Next<Stage> {
    if state.status() == Status::Processing && state.retry_count() > 0 {
        Next::Node(Stage::Reasoning)
    } else {
        Next::End
    }
}

/// reasoning -> tool_execution -> [quality_check -> reasoning]*, with at most
/// `max_retries + 1` passes. The step limit backs up that bound.
pub fn build_exam_graph(tools: Arc<ExamTools>) -> Result<ExamGraph, GraphError> {
    let passes = tools.config().review.max_retries as usize + 1;
    GraphBuilder::new()
        .add_node(Stage::Reasoning, ReasoningNode)
        .add_node(Stage::ToolExecution, ExecutionNode::new(tools.clone()))
        .add_node(Stage::QualityCheck, QualityCheckNode::new(tools))
        .set_entry(Stage::Reasoning)
        .add_edge(Stage::Reasoning, Stage::ToolExecution)
        .add_conditional_edge(Stage::ToolExecution, route_after_execution)
        .add_conditional_edge(Stage::QualityCheck, route_after_quality_check)
        .with_config(ExecutionConfig::with_max_steps(3 * passes))
        .with_observer(Arc::new(TracingObserver))
        .build()
}
