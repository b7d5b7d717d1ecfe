//! Event vocabulary for the observer boundary
//!
//! Every observable change in a pipeline run is pushed to subscribers as one
//! of these events: phase changes, worker status, transcript messages,
//! activity log lines, tool-use notices, errors, and run completion. The
//! push model is one-directional; observers never mutate pipeline state
//! through events.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::session::{Message, Phase, WorkerDescriptor};

/// Core event enum - the vocabulary of pipeline activity
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PipelineEvent {
    /// The pipeline advanced to a new phase
    PhaseChanged { phase: Phase },
    /// A worker descriptor changed status or progress
    Worker { worker: WorkerDescriptor },
    /// A message was appended to the conversation transcript
    Message { message: Message },
    /// An activity log line (cosmetic, icon-prefixed)
    Activity { text: String, icon: String },
    /// The external agent invoked a tool during a turn (side channel)
    ToolUsed { tool: String, detail: String },
    /// An error occurred; recoverable errors still surface here
    Error { context: String, message: String },
    /// The run finished and the spec document exists at this path
    Completed { spec_path: PathBuf },
}

impl PipelineEvent {
    /// Get the event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            PipelineEvent::PhaseChanged { .. } => "PhaseChanged",
            PipelineEvent::Worker { .. } => "Worker",
            PipelineEvent::Message { .. } => "Message",
            PipelineEvent::Activity { .. } => "Activity",
            PipelineEvent::ToolUsed { .. } => "ToolUsed",
            PipelineEvent::Error { .. } => "Error",
            PipelineEvent::Completed { .. } => "Completed",
        }
    }
}
