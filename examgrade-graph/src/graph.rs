use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Instant;

use examgrade_core::GradeError;

use crate::{ExecutionConfig, GraphError, Observer};

/// Identifier of a node. Usually a small `Copy` enum.
pub trait NodeId: Copy + Eq + Hash + fmt::Display + Send + Sync + 'static {}

impl<T> NodeId for T where T: Copy + Eq + Hash + fmt::Display + Send + Sync + 'static {}

/// Where control goes after a node finishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Next<N> {
    Node(N),
    End,
}

#[async_trait::async_trait]
pub trait GraphNode<S: Send + 'static>: Send + Sync {
    async fn run(&self, state: S) -> Result<S, GradeError>;
}

type Router<S, N> = Box<dyn Fn(&S) -> Next<N> + Send + Sync>;

enum Edge<S, N> {
    Direct(N),
    Conditional(Router<S, N>),
}

pub struct GraphBuilder<S: Send + 'static, N> {
    nodes: HashMap<N, Arc<dyn GraphNode<S>>>,
    edges: HashMap<N, Edge<S, N>>,
    entry: Option<N>,
    config: ExecutionConfig,
    observers: Vec<Arc<dyn Observer>>,
}

impl<S: Send + 'static, N: NodeId> Default for GraphBuilder<S, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Send + 'static, N: NodeId> GraphBuilder<S, N> {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            edges: HashMap::new(),
            entry: None,
            config: ExecutionConfig::default(),
            observers: Vec::new(),
        }
    }

    pub fn add_node<G>(mut self, id: N, node: G) -> Self
    where
        G: GraphNode<S> + 'static,
    {
        self.nodes.insert(id, Arc::new(node));
        self
    }

    pub fn set_entry(mut self, id: N) -> Self {
        self.entry = Some(id);
        self
    }

    pub fn add_edge(mut self, from: N, to: N) -> Self {
        self.edges.insert(from, Edge::Direct(to));
        self
    }

    /// Routes out of `from` by inspecting the state it produced. Nodes
    /// without any outgoing edge end the run.
    pub fn add_conditional_edge<F>(mut self, from: N, router: F) -> Self
    where
        F: Fn(&S) -> Next<N> + Send + Sync + 'static,
    {
        self.edges.insert(from, Edge::Conditional(Box::new(router)));
        self
    }

    pub fn with_config(mut self, config: ExecutionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn build(self) -> Result<ExecutableGraph<S, N>, GraphError> {
        let entry = self.entry.ok_or(GraphError::MissingEntry)?;
        if !self.nodes.contains_key(&entry) {
            return Err(GraphError::MissingNode {
                node: entry.to_string(),
            });
        }
        for (from, edge) in &self.edges {
            if !self.nodes.contains_key(from) {
                return Err(GraphError::MissingNode {
                    node: from.to_string(),
                });
            }
            if let Edge::Direct(to) = edge {
                if !self.nodes.contains_key(to) {
                    return Err(GraphError::InvalidEdge {
                        from: from.to_string(),
                        to: to.to_string(),
                    });
                }
            }
        }
        Ok(ExecutableGraph {
            nodes: self.nodes,
            edges: self.edges,
            entry,
            config: self.config,
            observers: self.observers,
        })
    }
}

pub struct ExecutableGraph<S: Send + 'static, N> {
    nodes: HashMap<N, Arc<dyn GraphNode<S>>>,
    edges: HashMap<N, Edge<S, N>>,
    entry: N,
    config: ExecutionConfig,
    observers: Vec<Arc<dyn Observer>>,
}

impl<S: Send + 'static, N: NodeId> ExecutableGraph<S, N> {
    pub async fn invoke(&self, state: S) -> Result<S, GraphError> {
        self.invoke_with_path(state).await.map(|(state, _)| state)
    }

    /// Runs the graph and also returns the sequence of visited nodes.
    pub async fn invoke_with_path(&self, mut state: S) -> Result<(S, Vec<N>), GraphError> {
        let mut current = self.entry;
        let mut path = Vec::new();
        loop {
            if let Some(max) = self.config.max_steps {
                if path.len() >= max {
                    return Err(GraphError::MaxStepsExceeded {
                        max,
                        reached: path.len(),
                    });
                }
            }

            let node = self
                .nodes
                .get(&current)
                .ok_or_else(|| GraphError::MissingNode {
                    node: current.to_string(),
                })?;
            let name = current.to_string();
            for observer in &self.observers {
                observer.on_node_enter(&name);
            }

            let started = Instant::now();
            state = match node.run(state).await {
                Ok(state) => state,
                Err(source) => {
                    let message = source.to_string();
                    for observer in &self.observers {
                        observer.on_error(&name, &message);
                    }
                    return Err(GraphError::NodeFailed { node: name, source });
                }
            };
            let elapsed = started.elapsed();
            for observer in &self.observers {
                observer.on_node_exit(&name, elapsed);
            }
            path.push(current);

            let next = match self.edges.get(&current) {
                Some(Edge::Direct(to)) => Next::Node(*to),
                Some(Edge::Conditional(router)) => router(&state),
                None => Next::End,
            };
            match next {
                Next::Node(to) => current = to,
                Next::End => break,
            }
        }
        Ok((state, path))
    }
}
