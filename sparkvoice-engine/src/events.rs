use sparkvoice_core::error::{CommandError, PhotoError};
use sparkvoice_core::intent::Intent;
use sparkvoice_core::types::CommandId;
use tokio::sync::mpsc;

/// Lifecycle notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    IntentDetected {
        text: String,
        intent: Intent,
    },
    CommandStarted {
        id: CommandId,
        intent: Intent,
    },
    CommandCompleted {
        id: CommandId,
        intent: Intent,
        error: Option<CommandError>,
    },
    PhotoSaved {
        media_id: String,
        error: Option<PhotoError>,
    },
}

impl ControllerEvent {
    /// A stable string label for logs and UI.
    pub fn label(&self) -> &'static str {
        match self {
            ControllerEvent::IntentDetected { .. } => "intent_detected",
            ControllerEvent::CommandStarted { .. } => "command_started",
            ControllerEvent::CommandCompleted { .. } => "command_completed",
            ControllerEvent::PhotoSaved { .. } => "photo_saved",
        }
    }
}

/// Sending half of the owner context.
///
/// Every component emits into one unbounded channel and a single consumer drains it, so
/// subscribers see lifecycle events in one total order regardless of which thread or task
/// produced them.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<ControllerEvent>,
}

impl EventSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ControllerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn emit(&self, event: ControllerEvent) {
        let label = event.label();
        if self.tx.send(event).is_err() {
            log::debug!("event receiver closed; dropping {label}");
        }
    }
}
