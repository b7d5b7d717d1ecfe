//! Distill - executable specs from decision-forcing conversations
//!
//! Distill runs a three-stage pipeline over a repository and a fuzzy
//! feature request:
//!
//! 1. **Explore** - one read-only agent turn summarizes the repository
//! 2. **Engineer** - a turn loop forces concrete decisions out of the
//!    human, one question at a time, until the agent signals readiness
//! 3. **Crystallize** - the session becomes a spec document on disk
//!
//! # Core Concepts
//!
//! - **Events over return values**: observers (TUI, headless printer,
//!   tests) follow a run through the broadcast [`events::EventBus`]
//! - **Degrade, never stall**: every agent failure has a deterministic
//!   fallback, so a started run always reaches a terminal state
//! - **One suspension point**: the engineer loop blocks only at the
//!   human-input rendezvous, which is also where cancellation lands
//!
//! # Modules
//!
//! - [`pipeline`] - controller and the three stages
//! - [`agent`] - turn executor trait and the CLI-backed implementation
//! - [`events`] - event types and the broadcast bus
//! - [`session`] - transcript, phases, and worker domain types
//! - [`render`] - deterministic spec-document rendering

pub mod agent;
pub mod cli;
pub mod events;
pub mod pipeline;
pub mod prompts;
pub mod render;
pub mod repo;
pub mod session;
pub mod tui;

// Re-export commonly used types
pub use agent::{AgentError, ClaudeTurnExecutor, ToolGrant, TurnExecutor, TurnOutput, TurnRequest};
pub use events::{EventBus, PipelineEvent, create_event_bus};
pub use pipeline::{PipelineConfig, PipelineController, PipelineError, PipelineResult};
pub use session::{EngineerOutcome, Message, Phase, Role, SessionId};
