//! Best-effort audit delivery.
//!
//! Events go through a bounded channel drained by one background task.
//! Delivery is at most once: a full queue or a failed write drops the event
//! with a warning and never affects the operation that produced it.

use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::{AuditDispatcherSettings, AuditEvent, AuditRepository};

/// Sending side of the audit queue.
#[derive(Clone)]
pub struct AuditDispatcher {
    sender: mpsc::Sender<AuditEvent>,
}

/// Handle to the background task draining the audit queue.
pub struct AuditDrain {
    task: JoinHandle<()>,
}

impl AuditDispatcher {
    /// Spawns the drain task on the current Tokio runtime.
    #[must_use]
    pub fn spawn(
        repository: Arc<dyn AuditRepository>,
        settings: AuditDispatcherSettings,
    ) -> (Self, AuditDrain) {
        let (sender, mut receiver) = mpsc::channel::<AuditEvent>(settings.queue_capacity.max(1));

        let task = tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                let action = event.action;
                let tenant_id = event.tenant_id;
                if let Err(error) = repository.append_event(event).await {
                    warn!(
                        tenant_id = %tenant_id,
                        action = action.as_str(),
                        error = %error,
                        "failed to persist audit event"
                    );
                }
            }
        });

        (Self { sender }, AuditDrain { task })
    }

    /// Queues one event without waiting. Returns whether it was accepted.
    pub fn emit(&self, event: AuditEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                warn!(
                    tenant_id = %event.tenant_id,
                    action = event.action.as_str(),
                    "audit queue is full, dropping event"
                );
                false
            }
            Err(TrySendError::Closed(event)) => {
                warn!(
                    tenant_id = %event.tenant_id,
                    action = event.action.as_str(),
                    "audit queue is closed, dropping event"
                );
                false
            }
        }
    }
}

impl AuditDrain {
    /// Waits until every dispatcher clone is dropped and the queue is drained.
    pub async fn finish(self) {
        if let Err(error) = self.task.await {
            warn!(error = %error, "audit drain task ended abnormally");
        }
    }
}
