use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use examgrade_core::GradeError;
use examgrade_graph::{
    ExecutionConfig, GraphBuilder, GraphError, GraphNode, Next, Observer,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Step {
    Inc,
    Double,
    Fail,
    Missing,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Inc => "inc",
            Step::Double => "double",
            Step::Fail => "fail",
            Step::Missing => "missing",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Default)]
struct Counter {
    count: i32,
}

struct Inc;

#[async_trait::async_trait]
impl GraphNode<Counter> for Inc {
    async fn run(&self, mut state: Counter) -> Result<Counter, GradeError> {
        state.count += 1;
        Ok(state)
    }
}

struct Double;

#[async_trait::async_trait]
impl GraphNode<Counter> for Double {
    async fn run(&self, mut state: Counter) -> Result<Counter, GradeError> {
        state.count *= 2;
        Ok(state)
    }
}

struct Fail;

#[async_trait::async_trait]
impl GraphNode<Counter> for Fail {
    async fn run(&self, _state: Counter) -> Result<Counter, GradeError> {
        Err(GradeError::Workflow("Unknown task: grade_essay".to_string()))
    }
}

#[derive(Default)]
struct CollectingObserver {
    events: Arc<Mutex<Vec<String>>>,
}

impl Observer for CollectingObserver {
    fn on_node_enter(&self, node: &str) {
        self.events.lock().unwrap().push(format!("enter:{node}"));
    }

    fn on_node_exit(&self, node: &str, _duration: Duration) {
        self.events.lock().unwrap().push(format!("exit:{node}"));
    }

    fn on_error(&self, node: &str, _error: &str) {
        self.events.lock().unwrap().push(format!("error:{node}"));
    }
}

#[tokio::test]
async fn direct_edges_run_in_order_and_end_without_outgoing_edge() {
    let graph = GraphBuilder::new()
        .add_node(Step::Inc, Inc)
        .add_node(Step::Double, Double)
        .add_edge(Step::Inc, Step::Double)
        .set_entry(Step::Inc)
        .build()
        .unwrap();

    let (state, path) = graph.invoke_with_path(Counter { count: 2 }).await.unwrap();
    assert_eq!(state.count, 6);
    assert_eq!(path, vec![Step::Inc, Step::Double]);
}

#[tokio::test]
async fn conditional_edge_loops_until_router_ends() {
    let graph = GraphBuilder::new()
        .add_node(Step::Inc, Inc)
        .add_conditional_edge(Step::Inc, |state: &Counter| {
            if state.count < 3 {
                Next::Node(Step::Inc)
            } else {
                Next::End
            }
        })
        .set_entry(Step::Inc)
        .build()
        .unwrap();

    let (state, path) = graph.invoke_with_path(Counter::default()).await.unwrap();
    assert_eq!(state.count, 3);
    assert_eq!(path.len(), 3);
}

#[tokio::test]
async fn max_steps_stops_runaway_loops() {
    let graph = GraphBuilder::new()
        .add_node(Step::Inc, Inc)
        .add_edge(Step::Inc, Step::Inc)
        .set_entry(Step::Inc)
        .with_config(ExecutionConfig::with_max_steps(4))
        .build()
        .unwrap();

    let err = graph.invoke(Counter::default()).await.unwrap_err();
    assert!(matches!(
        err,
        GraphError::MaxStepsExceeded { max: 4, reached: 4 }
    ));
}

#[tokio::test]
async fn node_errors_are_wrapped_with_node_name_and_observed() {
    let observer = CollectingObserver::default();
    let events = Arc::clone(&observer.events);
    let graph = GraphBuilder::new()
        .add_node(Step::Inc, Inc)
        .add_node(Step::Fail, Fail)
        .add_edge(Step::Inc, Step::Fail)
        .set_entry(Step::Inc)
        .with_observer(Arc::new(observer))
        .build()
        .unwrap();

    let err = graph.invoke(Counter::default()).await.unwrap_err();
    match &err {
        GraphError::NodeFailed { node, .. } => assert_eq!(node, "fail"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(
        *events.lock().unwrap(),
        vec!["enter:inc", "exit:inc", "enter:fail", "error:fail"]
    );

    let err: GradeError = err.into();
    assert_eq!(err.to_string(), "Unknown task: grade_essay");
}

#[test]
fn build_requires_entry() {
    let result = GraphBuilder::<Counter, Step>::new()
        .add_node(Step::Inc, Inc)
        .build();
    assert!(matches!(result, Err(GraphError::MissingEntry)));
}

#[test]
fn build_rejects_edges_to_unknown_nodes() {
    let result = GraphBuilder::new()
        .add_node(Step::Inc, Inc)
        .add_edge(Step::Inc, Step::Missing)
        .set_entry(Step::Inc)
        .build();
    assert!(matches!(result, Err(GraphError::InvalidEdge { .. })));
}

#[tokio::test]
async fn conditional_route_to_unknown_node_fails_at_runtime() {
    let graph = GraphBuilder::new()
        .add_node(Step::Inc, Inc)
        .add_conditional_edge(Step::Inc, |_: &Counter| Next::Node(Step::Missing))
        .set_entry(Step::Inc)
        .build()
        .unwrap();

    let err = graph.invoke(Counter::default()).await.unwrap_err();
    assert!(matches!(err, GraphError::MissingNode { node } if node == "missing"));
}
