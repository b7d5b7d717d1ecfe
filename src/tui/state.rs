//! TUI state - the rendered projection of pipeline events
//!
//! State mutates only by applying bus events and local key input; rendering
//! reads it and never writes back.

use std::path::PathBuf;

use rand::prelude::IndexedRandom;
use tracing::debug;

use crate::events::PipelineEvent;
use crate::pipeline::WAITING_FOR_INPUT;
use crate::session::{Message, Phase, WorkerDescriptor, WorkerKind, WorkerStatus};

/// Words shown next to the spinner while the agent is thinking
const STREAMING_WORDS: &[&str] = &[
    "Thinking", "Pondering", "Distilling", "Weighing", "Sifting", "Mulling",
];

/// Maximum activity lines retained for display
const MAX_ACTIVITY_LINES: usize = 200;

pub struct TuiState {
    pub phase: Phase,
    pub workers: Vec<WorkerDescriptor>,
    pub activity: Vec<String>,
    pub messages: Vec<Message>,
    pub input: String,
    pub streaming_word: &'static str,
    pub spec_path: Option<PathBuf>,
    pub last_error: Option<String>,
    pub should_quit: bool,
    tick_count: u64,
}

impl TuiState {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            workers: Vec::new(),
            activity: Vec::new(),
            messages: Vec::new(),
            input: String::new(),
            streaming_word: STREAMING_WORDS[0],
            spec_path: None,
            last_error: None,
            should_quit: false,
            tick_count: 0,
        }
    }

    /// Apply one pipeline event to the display state
    pub fn apply_event(&mut self, event: PipelineEvent) {
        debug!(event_type = event.event_type(), "TuiState::apply_event");
        match event {
            PipelineEvent::PhaseChanged { phase } => {
                self.phase = phase;
            }
            PipelineEvent::Worker { worker } => {
                match self.workers.iter_mut().find(|w| w.id == worker.id) {
                    Some(existing) => *existing = worker,
                    None => self.workers.push(worker),
                }
            }
            PipelineEvent::Message { message } => {
                self.messages.push(message);
            }
            PipelineEvent::Activity { text, icon } => {
                self.push_activity(format!("{} {}", icon, text));
            }
            PipelineEvent::ToolUsed { tool, detail } => {
                self.push_activity(format!("\u{1F527} {} {}", tool, detail));
            }
            PipelineEvent::Error { context, message } => {
                self.last_error = Some(format!("{}: {}", context, message));
                self.push_activity(format!("\u{274C} {}: {}", context, message));
            }
            PipelineEvent::Completed { spec_path } => {
                self.push_activity(format!("\u{1F389} Spec ready: {}", spec_path.display()));
                self.spec_path = Some(spec_path);
            }
        }
    }

    fn push_activity(&mut self, line: String) {
        self.activity.push(line);
        if self.activity.len() > MAX_ACTIVITY_LINES {
            let excess = self.activity.len() - MAX_ACTIVITY_LINES;
            self.activity.drain(..excess);
        }
    }

    /// Input is live only while the conversation is waiting on the human
    pub fn input_enabled(&self) -> bool {
        self.workers.iter().any(|w| {
            w.kind == WorkerKind::Engineer
                && w.status == WorkerStatus::Running
                && w.progress.as_deref() == Some(WAITING_FOR_INPUT)
        })
    }

    /// Whether any worker is actively thinking (spinner shown)
    pub fn is_busy(&self) -> bool {
        self.spec_path.is_none()
            && self.phase != Phase::Idle
            && !self.input_enabled()
    }

    /// Periodic refresh: rotate the streaming word occasionally
    pub fn tick(&mut self) {
        self.tick_count += 1;
        if self.tick_count % 30 == 0 {
            self.streaming_word = STREAMING_WORDS
                .choose(&mut rand::rng())
                .copied()
                .unwrap_or(STREAMING_WORDS[0]);
        }
    }

    pub fn push_char(&mut self, c: char) {
        self.input.push(c);
    }

    pub fn backspace(&mut self) {
        self.input.pop();
    }

    /// Take the pending input line, leaving the buffer empty
    pub fn take_input(&mut self) -> String {
        std::mem::take(&mut self.input)
    }
}

impl Default for TuiState {
    fn default() -> Self {
        Self::new()
    }
}
