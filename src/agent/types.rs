//! Turn request/response types
//!
//! A turn is one request/response exchange with the external agent
//! capability. Each invocation is stateless from the executor's point of
//! view; conversational continuity is carried entirely by the
//! [`SessionId`] continuation token the caller threads between turns.

use std::path::PathBuf;

use crate::session::SessionId;

/// Tool capability set granted to the agent for one turn
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ToolGrant {
    /// Pure conversation, no tools
    #[default]
    Conversation,
    /// Read-only repository analysis tools
    ReadOnly,
    /// File-write capability for document generation
    Write,
}

impl ToolGrant {
    /// Tool names passed to the agent CLI for this grant
    pub fn allowed_tools(self) -> &'static [&'static str] {
        match self {
            ToolGrant::Conversation => &[],
            ToolGrant::ReadOnly => &["Read", "Grep", "Glob", "Bash"],
            ToolGrant::Write => &["Write"],
        }
    }
}

/// Parameters for one conversational turn
#[derive(Clone, Debug)]
pub struct TurnRequest {
    /// Prompt text for this turn. Must be non-empty.
    pub prompt: String,
    /// System prompt establishing the agent's role
    pub system_prompt: String,
    /// Working directory for the agent process; must be a readable directory
    pub cwd: PathBuf,
    /// Continuation token from a prior turn, if any
    pub session: Option<SessionId>,
    /// Tool capability set for this turn
    pub tools: ToolGrant,
}

/// Result of one conversational turn
#[derive(Clone, Debug)]
pub struct TurnOutput {
    /// Final accumulated assistant text for the turn
    pub text: String,
    /// Continuation token for resuming this conversation, if one was issued
    pub session: Option<SessionId>,
    /// Number of internal agent turns consumed (informational)
    pub num_turns: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_grants() {
        assert!(ToolGrant::Conversation.allowed_tools().is_empty());
        assert_eq!(ToolGrant::ReadOnly.allowed_tools().len(), 4);
        assert_eq!(ToolGrant::Write.allowed_tools(), &["Write"]);
    }
}
