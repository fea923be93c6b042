//! Conversation events published to the host.

use tokio::sync::mpsc;

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernelEvent {
    /// Someone spoke to the bot. Sent before the response is computed.
    PersonSpeaks { session_id: String, input: String },
    /// The bot answered. Sent after the response has been recorded.
    BotResponds { session_id: String, response: String },
}

/// Optional sender half. Events are dropped, never awaited, when nobody is
/// listening or the listener falls behind.
#[derive(Default)]
pub(crate) struct EventSink {
    tx: Option<mpsc::Sender<KernelEvent>>,
}

impl EventSink {
    pub(crate) fn subscribe(&mut self) -> mpsc::Receiver<KernelEvent> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        self.tx = Some(tx);
        rx
    }

    pub(crate) fn emit(&self, event: KernelEvent) {
        let Some(tx) = &self.tx else {
            return;
        };
        match tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                tracing::warn!("Event channel full, dropping {:?}", event);
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("Event receiver dropped");
            }
        }
    }
}
