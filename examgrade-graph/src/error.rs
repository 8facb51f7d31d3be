use examgrade_core::GradeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("node failed: {node}: {source}")]
    NodeFailed {
        node: String,
        #[source]
        source: GradeError,
    },
    #[error("missing node: {node}")]
    MissingNode { node: String },
    #[error("graph has no entry node")]
    MissingEntry,
    #[error("invalid edge from '{from}' to '{to}'")]
    InvalidEdge { from: String, to: String },
    #[error("Max steps exceeded: reached {reached}, limit {max}")]
    MaxStepsExceeded { max: usize, reached: usize },
}

impl From<GraphError> for GradeError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::NodeFailed { source, .. } => source,
            other => GradeError::Workflow(other.to_string()),
        }
    }
}
