//! Embedded prompts
//!
//! Prompt text is compiled into the binary from .pmt files, plus the
//! builders that compose per-turn prompts from run data.

use std::path::Path;

use tracing::debug;

use crate::session::EngineerOutcome;

/// System prompt for the repository exploration turn
pub const EXPLORE_SYSTEM: &str = include_str!("../../prompts/explore_system.pmt");

/// Analysis prompt sent on the exploration turn
pub const EXPLORE: &str = include_str!("../../prompts/explore.pmt");

/// System prompt for the decision-forcing conversation
pub const ENGINEER_SYSTEM: &str = include_str!("../../prompts/engineer_system.pmt");

/// System prompt for the document-writing turn
pub const CRYSTALLIZE_SYSTEM: &str = include_str!("../../prompts/crystallize_system.pmt");

/// Get an embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "explore" => Some(EXPLORE),
        "explore_system" => Some(EXPLORE_SYSTEM),
        "engineer_system" => Some(ENGINEER_SYSTEM),
        "crystallize_system" => Some(CRYSTALLIZE_SYSTEM),
        _ => None,
    }
}

/// Compose the initial engineer-stage prompt: repository summary, feature
/// request, and the instruction to ask the first question
pub fn initial_engineer_prompt(repo_summary: &str, feature_request: &str) -> String {
    format!(
        "Repository Analysis:\n{}\n\nFeature Request: {}\n\nStart the conversation. \
         Ask your first question to understand what the user really wants.",
        repo_summary, feature_request
    )
}

/// Compose the crystallize-stage prompt embedding the full session
pub fn crystallize_prompt(outcome: &EngineerOutcome, output_path: &Path) -> String {
    let mut conversation = String::new();
    for message in &outcome.transcript {
        conversation.push_str(&format!("{}: {}\n\n", message.role.log_label(), message.text));
    }

    format!(
        "Based on this engineering session, generate a spec file.\n\n\
         Repository Analysis:\n{}\n\n\
         Original Feature Request:\n{}\n\n\
         Conversation and Decisions:\n{}\n\
         Create a spec file at {} that includes:\n\n\
         1. **Feature Summary** - What we're building and why\n\
         2. **Technical Decisions** - All decisions made during the conversation\n\
         3. **Files to Create/Modify** - Exact file paths and what changes\n\
         4. **Implementation Steps** - Clear, ordered steps\n\
         5. **Constraints** - What NOT to do, patterns to follow\n\
         6. **Acceptance Criteria** - How to verify it's done\n\n\
         Make it so clear that ANY developer can execute it without asking questions.\n\
         Use the exact file paths and patterns from the repo analysis.",
        outcome.repo_summary,
        outcome.feature_request,
        conversation,
        output_path.display()
    )
}
