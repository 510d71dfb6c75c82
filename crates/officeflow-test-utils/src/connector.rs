use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use futures::channel::mpsc;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::StreamExt;

use officeflow_core::error::{OfficeflowError, Result};
use officeflow_core::traits::PushConnector;
use officeflow_core::types::ProjectId;

/// Sender side of one scripted connection epoch.
pub type SessionFeed = mpsc::UnboundedSender<Result<String>>;

enum Outcome {
    Refuse(String),
    Accept(mpsc::UnboundedReceiver<Result<String>>),
}

/// Push connector whose handshakes follow a script.
///
/// Each `connect` consumes the next scripted outcome. An exhausted script
/// refuses the handshake.
#[derive(Default)]
pub struct ScriptedConnector {
    script: Mutex<VecDeque<Outcome>>,
    calls: AtomicUsize,
    projects: Mutex<Vec<ProjectId>>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a successful handshake; frames sent on the returned feed are
    /// delivered in order. Dropping the feed closes the connection.
    pub fn accept(&self) -> SessionFeed {
        let (tx, rx) = mpsc::unbounded();
        self.script.lock().unwrap().push_back(Outcome::Accept(rx));
        tx
    }

    /// Script a failed handshake.
    pub fn refuse(&self, reason: impl Into<String>) {
        self.script
            .lock()
            .unwrap()
            .push_back(Outcome::Refuse(reason.into()));
    }

    /// Number of handshakes attempted so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Projects passed to each handshake, in order.
    pub fn projects(&self) -> Vec<ProjectId> {
        self.projects.lock().unwrap().clone()
    }
}

impl PushConnector for ScriptedConnector {
    fn connect(
        &self,
        project: ProjectId,
    ) -> BoxFuture<'_, Result<BoxStream<'static, Result<String>>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.projects.lock().unwrap().push(project);
        let next = self.script.lock().unwrap().pop_front();
        Box::pin(async move {
            match next {
                Some(Outcome::Accept(rx)) => Ok(rx.boxed()),
                Some(Outcome::Refuse(reason)) => Err(OfficeflowError::ConnectionLost(reason)),
                None => Err(OfficeflowError::ConnectionLost("script exhausted".into())),
            }
        })
    }
}
