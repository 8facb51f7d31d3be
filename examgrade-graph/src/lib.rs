mod config;
mod error;
mod graph;
mod observer;

pub use config::ExecutionConfig;
pub use error::GraphError;
pub use graph::{ExecutableGraph, GraphBuilder, GraphNode, Next, NodeId};
pub use observer::{Observer, TracingObserver};
