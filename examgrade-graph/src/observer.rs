use std::time::Duration;

pub trait Observer: Send + Sync {
    fn on_node_enter(&self, _node: &str) {}
    fn on_node_exit(&self, _node: &str, _duration: Duration) {}
    fn on_error(&self, _node: &str, _error: &str) {}
}

/// Emits node lifecycle events through `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn on_node_enter(&self, node: &str) {
        tracing::debug!(node, "node enter");
    }

    fn on_node_exit(&self, node: &str, duration: Duration) {
        tracing::debug!(node, duration_ms = duration.as_millis() as u64, "node exit");
    }

    fn on_error(&self, node: &str, error: &str) {
        tracing::error!(node, error, "node failed");
    }
}
