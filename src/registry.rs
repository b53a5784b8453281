//! Per-user container of active `PositionMonitor`s.

use crate::dispatcher::TickDispatcher;
use crate::monitor::PositionMonitor;
use crate::types::ExecutionId;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Owns the `PositionMonitor`s for one user and keeps the [`TickDispatcher`]
/// in sync with which tokens they need.
///
/// `PositionMonitor`s are owned exclusively by their registry; the
/// dispatcher only holds `Arc` handles indexed by token. Iteration over a
/// user's monitors always goes through this registry.
pub struct MonitorRegistry {
    monitors: DashMap<ExecutionId, Arc<PositionMonitor>>,
    dispatcher: Arc<TickDispatcher>,
}

impl MonitorRegistry {
    pub fn new(dispatcher: Arc<TickDispatcher>) -> Self {
        Self {
            monitors: DashMap::new(),
            dispatcher,
        }
    }

    /// Registers `monitor` under `execution_id` and subscribes its current
    /// leg tokens with the dispatcher. Idempotent: if `execution_id` is
    /// already registered, this logs a warning and otherwise does nothing.
    pub fn start_monitoring(&self, execution_id: ExecutionId, monitor: Arc<PositionMonitor>) {
        if self.monitors.contains_key(&execution_id) {
            warn!(
                execution_id = execution_id.0,
                "start_monitoring called for an already-registered execution id; ignoring"
            );
            return;
        }

        let tokens = monitor.instrument_tokens();
        self.dispatcher.register(execution_id, monitor.clone(), &tokens);
        self.monitors.insert(execution_id, monitor);
        info!(execution_id = execution_id.0, "position monitor registered");
    }

    /// Removes `execution_id`, deregisters its tokens from the dispatcher,
    /// and calls `monitor.stop()`. No-op if `execution_id` is not
    /// registered.
    pub fn stop_monitoring(&self, execution_id: ExecutionId) {
        let Some((_, monitor)) = self.monitors.remove(&execution_id) else {
            debug!(
                execution_id = execution_id.0,
                "stop_monitoring called for an unknown execution id; no-op"
            );
            return;
        };

        let tokens = monitor.instrument_tokens();
        let released = self.dispatcher.deregister(execution_id, &tokens);
        monitor.stop();
        info!(
            execution_id = execution_id.0,
            released_tokens = released.len(),
            "position monitor deregistered"
        );
    }

    pub fn get(&self, execution_id: ExecutionId) -> Option<Arc<PositionMonitor>> {
        self.monitors.get(&execution_id).map(|entry| entry.value().clone())
    }

    pub fn count(&self) -> usize {
        self.monitors.len()
    }

    pub fn snapshot(&self) -> Vec<Arc<PositionMonitor>> {
        self.monitors.iter().map(|entry| entry.value().clone()).collect()
    }
}
