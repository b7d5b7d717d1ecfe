//! Pipeline controller - owns run lifecycle, phase, and shared run state
//!
//! One controller instance serves one process. A run moves through
//! Explore, Engineer, and Crystallize in order; the controller enforces
//! single-run-at-a-time, routes human input to the engineer's rendezvous
//! slot, and guarantees the running guard clears on every exit path.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::{debug, info, warn};

use super::crystallize::CrystallizeError;
use super::rendezvous::{HumanInput, InputSlot};
use super::{crystallize, engineer, explore};
use crate::agent::TurnExecutor;
use crate::events::EventBus;
use crate::session::{Message, Phase};

/// Default number of agent turns the engineer stage may consume
pub const DEFAULT_MAX_TURNS: u32 = 10;

/// Configuration for a pipeline run
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Local path of the repository under analysis
    pub repo_path: PathBuf,
    /// The feature request driving the conversation
    pub feature_request: String,
    /// Where to write the spec document; defaults to SPEC.md in the repo
    pub output_path: Option<PathBuf>,
    /// Agent-turn budget for the engineer stage
    pub max_turns: u32,
    /// Scripted human inputs (demo mode); None means interactive
    pub scripted_inputs: Option<Vec<String>>,
}

impl PipelineConfig {
    pub fn new(repo_path: PathBuf, feature_request: impl Into<String>) -> Self {
        Self {
            repo_path,
            feature_request: feature_request.into(),
            output_path: None,
            max_turns: DEFAULT_MAX_TURNS,
            scripted_inputs: None,
        }
    }
}

/// Terminal outcome of a run, for callers that do not watch the bus
#[derive(Clone, Debug)]
pub struct PipelineResult {
    pub success: bool,
    pub spec_path: Option<PathBuf>,
    pub error: Option<String>,
}

impl PipelineResult {
    fn success(spec_path: PathBuf) -> Self {
        Self {
            success: true,
            spec_path: Some(spec_path),
            error: None,
        }
    }

    fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            spec_path: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("a pipeline run is already in progress")]
    AlreadyRunning,
    #[error("run cancelled")]
    Cancelled,
    #[error(transparent)]
    Crystallize(#[from] CrystallizeError),
}

/// Orchestrates one run end to end
pub struct PipelineController {
    pub(crate) executor: Arc<dyn TurnExecutor>,
    pub(crate) bus: Arc<EventBus>,
    pub(crate) config: PipelineConfig,
    pub(crate) cancelled: AtomicBool,
    pub(crate) input: InputSlot,
    pub(crate) history: Mutex<Vec<Message>>,
    running: AtomicBool,
}

impl PipelineController {
    pub fn new(executor: Arc<dyn TurnExecutor>, bus: Arc<EventBus>, config: PipelineConfig) -> Self {
        debug!(
            repo = %config.repo_path.display(),
            max_turns = config.max_turns,
            "PipelineController::new"
        );
        Self {
            executor,
            bus,
            config,
            cancelled: AtomicBool::new(false),
            input: InputSlot::new(),
            history: Mutex::new(Vec::new()),
            running: AtomicBool::new(false),
        }
    }

    /// Run the full pipeline. Returns an error result immediately if a run
    /// is already in progress; the running guard clears on every exit.
    pub async fn start(&self) -> PipelineResult {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("PipelineController::start: rejected, run already in progress");
            self.bus.error("pipeline", PipelineError::AlreadyRunning.to_string());
            return PipelineResult::failure(PipelineError::AlreadyRunning.to_string());
        }
        self.cancelled.store(false, Ordering::SeqCst);
        self.history.lock().expect("history poisoned").clear();
        info!(feature = %self.config.feature_request, "pipeline run starting");

        let outcome = self.run_stages().await;
        self.running.store(false, Ordering::SeqCst);

        match outcome {
            Ok(spec_path) => {
                info!(spec = %spec_path.display(), "pipeline run complete");
                PipelineResult::success(spec_path)
            }
            Err(err) => {
                warn!(%err, "pipeline run failed");
                self.bus.error("pipeline", err.to_string());
                PipelineResult::failure(err.to_string())
            }
        }
    }

    async fn run_stages(&self) -> Result<PathBuf, PipelineError> {
        self.bus.phase_changed(Phase::Explore);
        let repo_summary = explore::run(self).await;
        self.check_cancelled()?;

        self.bus.phase_changed(Phase::Engineer);
        let outcome = engineer::run(self, repo_summary).await?;

        self.bus.phase_changed(Phase::Crystallize);
        let spec_path = crystallize::run(self, &outcome).await?;

        self.bus.phase_changed(Phase::Complete);
        self.bus.completed(&spec_path);
        Ok(spec_path)
    }

    /// Deliver human input to the engineer stage
    ///
    /// Strict no-op unless the turn loop is suspended at the rendezvous:
    /// input typed while the agent is thinking is dropped, never queued.
    /// Delivery only; the loop records the input in the transcript after
    /// its termination-phrase check, so terminal phrases never appear in
    /// the transcript or the generated document.
    pub fn submit_input(&self, text: impl Into<String>) -> bool {
        let delivered = self.input.resolve(HumanInput::Text(text.into()));
        if !delivered {
            debug!("PipelineController::submit_input: no waiter, input dropped");
        }
        delivered
    }

    /// Request cooperative cancellation
    ///
    /// Takes effect at the next rendezvous or post-turn check; a turn
    /// already in flight finishes and its result is discarded.
    pub fn cancel(&self) {
        info!("PipelineController::cancel: cancellation requested");
        self.cancelled.store(true, Ordering::SeqCst);
        self.input.resolve(HumanInput::Cancelled);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Whether the engineer stage is waiting for human input right now
    pub fn awaiting_input(&self) -> bool {
        self.input.has_waiter()
    }

    pub(crate) fn check_cancelled(&self) -> Result<(), PipelineError> {
        if self.cancelled.load(Ordering::SeqCst) {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub(crate) fn output_path(&self) -> PathBuf {
        self.config
            .output_path
            .clone()
            .unwrap_or_else(|| self.config.repo_path.join("SPEC.md"))
    }

    pub(crate) fn history_snapshot(&self) -> Vec<Message> {
        self.history.lock().expect("history poisoned").clone()
    }

    pub(crate) fn push_agent_message(&self, text: &str) {
        let message = Message::agent(text);
        self.bus.message(&message);
        self.history.lock().expect("history poisoned").push(message);
    }

    /// Record an accepted human input in the transcript
    pub(crate) fn push_human_message(&self, text: &str) {
        let message = Message::human(text);
        self.bus.message(&message);
        self.history.lock().expect("history poisoned").push(message);
    }
}
