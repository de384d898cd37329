// src/application/state.rs
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::adapters::SourceAdapter;
use crate::application::MediatorConfig;
use crate::connection::ConnectionManager;
use crate::events::EventBus;
use crate::services::MediatorService;

/// Process-wide mediation state.
///
/// Built exactly once at process/session start and handed to request
/// handlers by reference; never re-created per call. Teardown is
/// explicit: `shutdown` stops the reconnection sweep.
pub struct AppState {
    pub event_bus: EventBus,
    pub connections: Arc<ConnectionManager>,
    pub mediator: Arc<MediatorService>,
    sweep: JoinHandle<()>,
}

impl AppState {
    /// Wire the mediation stack over the given adapters and start the
    /// background reconnection sweep. Sources are not connected yet;
    /// call [`MediatorService::initialize`] next.
    pub fn build(adapters: Vec<Arc<dyn SourceAdapter>>, config: MediatorConfig) -> Self {
        let event_bus = EventBus::new();
        let connections = Arc::new(ConnectionManager::new(
            adapters,
            config.clone(),
            event_bus.clone(),
        ));
        let mediator = Arc::new(MediatorService::new(
            Arc::clone(&connections),
            config,
            event_bus.clone(),
        ));
        let sweep = connections.spawn_reconnect_sweep();

        Self {
            event_bus,
            connections,
            mediator,
            sweep,
        }
    }

    /// Stop background work. The mediator itself holds no other
    /// resources that outlive the process.
    pub fn shutdown(&self) {
        self.sweep.abort();
    }
}

impl Drop for AppState {
    fn drop(&mut self) {
        self.sweep.abort();
    }
}
