//! Event bus - pub/sub channel between the pipeline and its observers
//!
//! The bus uses a tokio broadcast channel to deliver events to all
//! subscribers with minimal latency. The pipeline emits, consumers (TUI,
//! plain-mode printer, tests) subscribe. Emission is fire-and-forget: with
//! no subscribers the event is dropped, and a full channel drops the oldest
//! events first.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

use super::types::PipelineEvent;
use crate::session::{Message, Phase, WorkerDescriptor};

/// Default channel capacity (events). Generous: a full session emits a few
/// hundred events at most.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 4096;

/// Central event bus for pipeline activity streaming
pub struct EventBus {
    tx: broadcast::Sender<PipelineEvent>,
}

impl EventBus {
    /// Create a new event bus with the given capacity
    pub fn new(capacity: usize) -> Self {
        debug!(capacity, "EventBus::new: creating event bus");
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Create a new event bus with default capacity
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Emit an event to all subscribers
    pub fn emit(&self, event: PipelineEvent) {
        debug!(event_type = event.event_type(), "EventBus::emit");
        // Ignore send errors (no subscribers is OK)
        let _ = self.tx.send(event);
    }

    /// Subscribe to receive events emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        debug!("EventBus::subscribe: new subscriber");
        self.tx.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    // === Convenience methods ===

    /// Emit a phase change
    pub fn phase_changed(&self, phase: Phase) {
        self.emit(PipelineEvent::PhaseChanged { phase });
    }

    /// Publish a worker descriptor snapshot
    pub fn worker(&self, worker: &WorkerDescriptor) {
        self.emit(PipelineEvent::Worker { worker: worker.clone() });
    }

    /// Publish a transcript message
    pub fn message(&self, message: &Message) {
        self.emit(PipelineEvent::Message {
            message: message.clone(),
        });
    }

    /// Emit an icon-prefixed activity log line
    pub fn activity(&self, text: impl Into<String>, icon: impl Into<String>) {
        self.emit(PipelineEvent::Activity {
            text: text.into(),
            icon: icon.into(),
        });
    }

    /// Emit a tool-use notice from the agent side channel
    pub fn tool_used(&self, tool: impl Into<String>, detail: impl Into<String>) {
        self.emit(PipelineEvent::ToolUsed {
            tool: tool.into(),
            detail: detail.into(),
        });
    }

    /// Emit an error event
    pub fn error(&self, context: impl Into<String>, message: impl Into<String>) {
        self.emit(PipelineEvent::Error {
            context: context.into(),
            message: message.into(),
        });
    }

    /// Emit run completion with the spec document path
    pub fn completed(&self, spec_path: &Path) {
        self.emit(PipelineEvent::Completed {
            spec_path: spec_path.to_path_buf(),
        });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

/// Create an event bus wrapped in an Arc for shared ownership
pub fn create_event_bus() -> Arc<EventBus> {
    Arc::new(EventBus::with_default_capacity())
}
