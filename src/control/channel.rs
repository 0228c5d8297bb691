//! Control Channel
//!
//! Fire-and-forget command queue drained by a single background task.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{CacheError, Result};
use crate::lifecycle::Registration;

/// Commands are applied one at a time in arrival order.
const CONTROL_QUEUE_DEPTH: usize = 32;

// == Control Message ==
/// Wire form is `{"type": "SKIP_WAITING"}` or `{"type": "CLEAR_CACHE"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    SkipWaiting,
    ClearCache,
}

impl fmt::Display for ControlMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlMessage::SkipWaiting => f.write_str("SKIP_WAITING"),
            ControlMessage::ClearCache => f.write_str("CLEAR_CACHE"),
        }
    }
}

/// Result of an applied command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ControlOutcome {
    /// The waiting version took over
    Activated { version: String },
    /// SKIP_WAITING with no waiting version
    NothingWaiting,
    /// Every store was deleted
    Cleared { stores: usize },
}

struct Envelope {
    message: ControlMessage,
    reply: oneshot::Sender<Result<ControlOutcome>>,
}

// == Control Channel ==
/// Sending half, cheap to clone.
#[derive(Debug, Clone)]
pub struct ControlChannel {
    tx: mpsc::Sender<Envelope>,
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("message", &self.message)
            .finish()
    }
}

impl ControlChannel {
    /// Queues a command. Returns as soon as it is queued; await the
    /// [`Completion`] to learn the outcome, or drop it.
    pub async fn post(&self, message: ControlMessage) -> Result<Completion> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Envelope { message, reply })
            .await
            .map_err(|_| CacheError::ChannelClosed)?;
        debug!(message = %message, "Control message queued");
        Ok(Completion { rx })
    }
}

/// Resolves once the control task has applied the command.
#[derive(Debug)]
pub struct Completion {
    rx: oneshot::Receiver<Result<ControlOutcome>>,
}

impl Completion {
    pub async fn wait(self) -> Result<ControlOutcome> {
        self.rx.await.map_err(|_| CacheError::ChannelClosed)?
    }
}

// == Control Task ==
/// Spawns the task that applies control commands to `registration`.
///
/// The task ends when every [`ControlChannel`] clone has been dropped.
pub fn spawn_control_task(registration: Arc<Registration>) -> (ControlChannel, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<Envelope>(CONTROL_QUEUE_DEPTH);

    let handle = tokio::spawn(async move {
        info!("Control task started");
        while let Some(envelope) = rx.recv().await {
            info!(message = %envelope.message, "Control message received");
            let outcome = apply(&registration, envelope.message).await;
            if let Err(err) = &outcome {
                warn!(message = %envelope.message, error = %err, "Control message failed");
            }
            // The sender may have dropped its Completion
            let _ = envelope.reply.send(outcome);
        }
        debug!("Control task stopped");
    });

    (ControlChannel { tx }, handle)
}

async fn apply(registration: &Registration, message: ControlMessage) -> Result<ControlOutcome> {
    match message {
        ControlMessage::SkipWaiting => Ok(match registration.skip_waiting().await? {
            Some(version) => ControlOutcome::Activated { version },
            None => ControlOutcome::NothingWaiting,
        }),
        ControlMessage::ClearCache => Ok(ControlOutcome::Cleared {
            stores: registration.clear_all_caches().await,
        }),
    }
}
