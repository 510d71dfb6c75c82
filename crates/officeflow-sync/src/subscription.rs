use std::sync::Arc;

use tracing::debug;

use officeflow_core::config::SyncConfig;
use officeflow_core::event::EventBus;
use officeflow_core::traits::{Backend, PushConnector};
use officeflow_core::types::{ConnectionState, ProjectId};

use crate::reconciler::{Reconciler, ReconcilerHandle};
use crate::state::Store;

/// Keeps exactly one reconciler alive for the currently selected project.
///
/// Changing the key cancels the previous reconciler before a new one is
/// spawned, so events of the old project never reach the store afterwards.
pub struct Subscription {
    connector: Arc<dyn PushConnector>,
    backend: Arc<dyn Backend>,
    store: Store,
    event_bus: EventBus,
    config: SyncConfig,
    key: Option<ProjectId>,
    active: Option<ReconcilerHandle>,
}

impl Subscription {
    pub fn new(
        connector: Arc<dyn PushConnector>,
        backend: Arc<dyn Backend>,
        store: Store,
        event_bus: EventBus,
        config: SyncConfig,
    ) -> Self {
        Self {
            connector,
            backend,
            store,
            event_bus,
            config,
            key: None,
            active: None,
        }
    }

    /// Select a project, or none. Setting the current key again is a no-op.
    pub fn set_key(&mut self, key: Option<ProjectId>) {
        if key == self.key {
            return;
        }
        if let Some(previous) = self.active.take() {
            previous.cancel();
        }
        debug!(from = ?self.key, to = ?key, "Subscription key changed");
        self.key = key;

        if let Some(project) = key {
            let reconciler = Reconciler::new(
                project,
                self.connector.clone(),
                self.backend.clone(),
                self.store.clone(),
                self.event_bus.clone(),
                self.config.clone(),
            );
            self.active = Some(reconciler.spawn());
        }
    }

    pub fn key(&self) -> Option<ProjectId> {
        self.key
    }

    pub fn handle(&self) -> Option<&ReconcilerHandle> {
        self.active.as_ref()
    }

    /// Connection state of the active reconciler, `Idle` without one.
    pub fn state(&self) -> ConnectionState {
        self.active
            .as_ref()
            .map_or(ConnectionState::Idle, ReconcilerHandle::state)
    }

    /// Drop the key and wait for the reconciler to exit.
    pub async fn shutdown(&mut self) {
        self.key = None;
        if let Some(handle) = self.active.take() {
            handle.shutdown().await;
        }
    }
}
