#[derive(Clone, Debug)]
pub struct ExecutionConfig {
    /// Upper bound on node executions for a single invocation.
    pub max_steps: Option<usize>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_steps: Some(50),
        }
    }
}

impl ExecutionConfig {
    pub fn unbounded() -> Self {
        Self { max_steps: None }
    }

    pub fn with_max_steps(max_steps: usize) -> Self {
        Self {
            max_steps: Some(max_steps),
        }
    }
}
