//! Push-channel reconciler.
//!
//! One reconciler owns the push connection of one project. It waits out a
//! short grace period, connects, feeds every frame through the reducers and
//! reconnects after a fixed delay whenever the connection ends. Cancellation
//! is final: once [`ReconcilerHandle::cancel`] returns, no handler of this
//! reconciler touches the [`Store`] again.

use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use officeflow_core::config::SyncConfig;
use officeflow_core::error::{OfficeflowError, Result};
use officeflow_core::event::EventBus;
use officeflow_core::traits::{Backend, PushConnector};
use officeflow_core::types::{AppEvent, ConnectionState, ProjectId};

use crate::protocol;
use crate::reducer::{self, Effect};
use crate::state::Store;

/// How a connection epoch ended.
enum EpochEnd {
    Cancelled,
    Closed(String),
}

pub struct Reconciler {
    project: ProjectId,
    connector: Arc<dyn PushConnector>,
    backend: Arc<dyn Backend>,
    store: Store,
    event_bus: EventBus,
    config: SyncConfig,
    cancel: CancellationToken,
    state_tx: watch::Sender<ConnectionState>,
}

impl Reconciler {
    pub fn new(
        project: ProjectId,
        connector: Arc<dyn PushConnector>,
        backend: Arc<dyn Backend>,
        store: Store,
        event_bus: EventBus,
        config: SyncConfig,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Idle);
        Self {
            project,
            connector,
            backend,
            store,
            event_bus,
            config,
            cancel: CancellationToken::new(),
            state_tx,
        }
    }

    /// Start the reconciler on the current runtime.
    pub fn spawn(self) -> ReconcilerHandle {
        let cancel = self.cancel.clone();
        let store = self.store.clone();
        let state_rx = self.state_tx.subscribe();
        let task = tokio::spawn(self.run());
        ReconcilerHandle {
            cancel,
            store,
            state_rx,
            task: Some(task),
        }
    }

    /// Run until cancelled or until reconnect attempts are exhausted.
    pub async fn run(self) {
        info!(project = %self.project, grace_ms = self.config.grace_period_ms, "Reconciler started");

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!(project = %self.project, "Cancelled during grace period");
                self.finish();
                return;
            }
            _ = tokio::time::sleep(self.config.grace_period()) => {}
        }

        let mut epoch: u64 = 0;
        let mut failures: u32 = 0;

        loop {
            self.transition(ConnectionState::Connecting);

            let connected = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                res = self.connector.connect(self.project) => res,
            };

            match connected {
                Ok(stream) => {
                    epoch += 1;
                    failures = 0;
                    self.transition(ConnectionState::Open);
                    info!(project = %self.project, epoch, "Push channel open");
                    match self.pump(stream, epoch).await {
                        EpochEnd::Cancelled => break,
                        EpochEnd::Closed(reason) => {
                            warn!(project = %self.project, epoch, reason = %reason, "Push channel closed, reconnecting");
                        }
                    }
                }
                Err(e) => {
                    warn!(project = %self.project, error = %e, "Push connect failed");
                }
            }

            if self.cancel.is_cancelled() {
                break;
            }
            self.transition(ConnectionState::Closed);

            failures += 1;
            if let Some(max) = self.config.max_reconnect_attempts {
                if failures > max {
                    let err = OfficeflowError::ConnectionLost(format!(
                        "gave up after {max} reconnect attempts"
                    ));
                    error!(project = %self.project, error = %err, "Reconciler stopped");
                    self.event_bus.publish(AppEvent::error(err.to_string()));
                    return;
                }
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.reconnect_delay()) => {}
            }
        }

        self.finish();
    }

    /// Drain one connection epoch.
    async fn pump(&self, mut stream: BoxStream<'static, Result<String>>, epoch: u64) -> EpochEnd {
        loop {
            let frame = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return EpochEnd::Cancelled,
                frame = stream.next() => frame,
            };

            let text = match frame {
                Some(Ok(text)) => text,
                Some(Err(e)) => return EpochEnd::Closed(e.to_string()),
                None => return EpochEnd::Closed("stream ended".to_string()),
            };

            let inbound = match protocol::decode(&text) {
                Ok(inbound) => inbound,
                Err(e) => {
                    warn!(epoch, error = %e, "Dropping push event");
                    continue;
                }
            };

            let effect = self.store.with(|state| {
                if self.cancel.is_cancelled() {
                    return None;
                }
                Some(reducer::apply(state, &inbound))
            });

            match effect {
                None => return EpochEnd::Cancelled,
                Some(Effect::None) => {}
                // Frames stay buffered in the stream while the roster is
                // fetched, so later events apply on top of it.
                Some(Effect::RefetchRoster) => {
                    if !self.refresh_roster().await {
                        return EpochEnd::Cancelled;
                    }
                }
            }
        }
    }

    /// Replace the roster from the backend. Returns false if cancelled.
    async fn refresh_roster(&self) -> bool {
        let fetched = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return false,
            res = self.backend.list_agents(self.project) => res,
        };

        match fetched {
            Ok(agents) => {
                let count = agents.len();
                let applied = self.store.with(|state| {
                    if self.cancel.is_cancelled() {
                        return false;
                    }
                    state.replace_roster(agents);
                    true
                });
                if applied {
                    debug!(project = %self.project, agents = count, "Roster refreshed");
                    self.event_bus.publish(AppEvent::RosterRefreshed { agents: count });
                }
                applied
            }
            Err(e) => {
                warn!(project = %self.project, error = %e, "Roster refresh failed");
                true
            }
        }
    }

    fn transition(&self, next: ConnectionState) {
        let changed = self.state_tx.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
        if changed {
            debug!(project = %self.project, state = %next, "Connection state");
            self.event_bus.publish(AppEvent::ConnectionState(next));
        }
    }

    fn finish(&self) {
        self.transition(ConnectionState::Cancelled);
        info!(project = %self.project, "Reconciler stopped");
    }
}

/// Owner handle of a running [`Reconciler`]. Dropping it cancels the task.
pub struct ReconcilerHandle {
    cancel: CancellationToken,
    store: Store,
    state_rx: watch::Receiver<ConnectionState>,
    task: Option<JoinHandle<()>>,
}

impl ReconcilerHandle {
    /// Stop the reconciler.
    ///
    /// The token is cancelled while holding the store lock, so any handler
    /// that has not yet applied its mutation sees the cancellation and
    /// skips it.
    pub fn cancel(&self) {
        self.store.with(|_| self.cancel.cancel());
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Cancel and wait for the task to exit.
    pub async fn shutdown(mut self) {
        self.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for ReconcilerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
