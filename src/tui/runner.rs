//! TUI runner - main loop that owns the terminal
//!
//! Spawns the pipeline as a background task, then drives rendering off two
//! sources: terminal events and the pipeline event bus. Key input feeds the
//! input line; Enter submits it to the controller; Esc or Ctrl+C cancels.

use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use eyre::Result;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::Tui;
use super::events::{Event, EventHandler};
use super::state::TuiState;
use super::views;
use crate::events::{EventBus, PipelineEvent};
use crate::pipeline::{PipelineController, PipelineResult};

pub struct TuiRunner {
    terminal: Tui,
    state: TuiState,
    event_handler: EventHandler,
    controller: Arc<PipelineController>,
    bus_rx: broadcast::Receiver<PipelineEvent>,
    pipeline_task: Option<JoinHandle<PipelineResult>>,
}

impl TuiRunner {
    pub fn new(terminal: Tui, controller: Arc<PipelineController>, bus: &EventBus) -> Self {
        debug!("TuiRunner::new");
        Self {
            terminal,
            state: TuiState::new(),
            event_handler: EventHandler::new(Duration::from_millis(33)), // ~30 FPS
            bus_rx: bus.subscribe(),
            controller,
            pipeline_task: None,
        }
    }

    /// Run the TUI main loop until the user exits
    pub async fn run(&mut self) -> Result<()> {
        debug!("TuiRunner::run: starting pipeline task");
        let controller = Arc::clone(&self.controller);
        self.pipeline_task = Some(tokio::spawn(async move { controller.start().await }));

        loop {
            self.terminal
                .draw(|frame| views::render(&self.state, frame))?;

            tokio::select! {
                event = self.event_handler.next() => {
                    match event? {
                        Event::Tick => self.state.tick(),
                        Event::Key(key) => self.handle_key(key),
                        Event::Resize(_, _) => {}
                    }
                }
                event = self.bus_rx.recv() => {
                    match event {
                        Ok(event) => self.state.apply_event(event),
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(n, "TUI lagged behind the event bus");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            debug!("event bus closed");
                        }
                    }
                }
            }

            if self.state.should_quit {
                break;
            }
        }

        if let Some(task) = self.pipeline_task.take() {
            if task.is_finished() {
                if let Ok(result) = task.await {
                    info!(success = result.success, "pipeline task finished");
                }
            } else {
                // Quit before completion: the cancel already landed, the
                // task unwinds at its next check
                task.abort();
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                info!("cancel requested from TUI");
                self.controller.cancel();
                self.state.should_quit = true;
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.controller.cancel();
                self.state.should_quit = true;
            }
            KeyCode::Char('q') if !self.state.input_enabled() => {
                if self.state.spec_path.is_some() {
                    self.state.should_quit = true;
                } else {
                    self.controller.cancel();
                    self.state.should_quit = true;
                }
            }
            KeyCode::Enter => {
                if self.state.input_enabled() {
                    let text = self.state.take_input();
                    if !text.trim().is_empty() {
                        debug!(len = text.len(), "submitting input from TUI");
                        self.controller.submit_input(text);
                    }
                }
            }
            KeyCode::Backspace => {
                if self.state.input_enabled() {
                    self.state.backspace();
                }
            }
            KeyCode::Char(c) => {
                if self.state.input_enabled() {
                    self.state.push_char(c);
                }
            }
            _ => {}
        }
    }
}
