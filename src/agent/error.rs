//! Agent invocation error types

use thiserror::Error;

/// Errors raised by a [`crate::agent::TurnExecutor`] invocation
///
/// Every failure of the external agent capability maps here: spawn failures,
/// non-zero exits, malformed stream output, empty results. The executor
/// never retries; recovery (fallback to scripted behavior) belongs to the
/// calling stage.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("failed to spawn agent process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("agent process exited with status {code:?}: {stderr}")]
    Exit { code: Option<i32>, stderr: String },

    #[error("malformed agent stream: {0}")]
    Malformed(String),

    #[error("agent returned no output text")]
    EmptyResponse,

    #[error("agent stream I/O error: {0}")]
    Io(#[source] std::io::Error),
}

impl AgentError {
    /// Short context string for error events
    pub fn kind(&self) -> &'static str {
        match self {
            AgentError::Spawn(_) => "spawn",
            AgentError::Exit { .. } => "exit",
            AgentError::Malformed(_) => "malformed",
            AgentError::EmptyResponse => "empty",
            AgentError::Io(_) => "io",
        }
    }
}
