//! Fallback script - deterministic canned responses
//!
//! When the live agent fails ([`crate::agent::AgentError`]), the explore and
//! engineer stages switch to this scripted behavior so the pipeline can
//! always reach a terminal state. Responses are indexed by turn number
//! (1st, 2nd, 3rd, else); the "else" branch always carries the termination
//! marker, so the conversation ends by a fixed turn count no matter what the
//! human types. Scripted responses never fail.

use std::path::Path;

use tracing::debug;

use crate::session::{Message, Role};

/// Literal token signaling that enough decisions have been gathered
///
/// Detection is a plain substring test. Known fragility: nothing stops the
/// marker from appearing inside trade-off discussion text; a structured
/// terminal signal would be more robust.
pub const TERMINATION_MARKER: &str = "SPEC_READY";

/// Human inputs that end the session without a further agent turn
pub const TERMINATION_PHRASES: &[&str] = &["done", "exit", "quit", "finish"];

/// Check whether a human input is an explicit termination phrase
/// (case-insensitive, surrounding whitespace ignored)
pub fn is_termination_phrase(input: &str) -> bool {
    let normalized = input.trim().to_lowercase();
    TERMINATION_PHRASES.contains(&normalized.as_str())
}

/// Check whether a response carries the termination marker
pub fn contains_marker(text: &str) -> bool {
    text.contains(TERMINATION_MARKER)
}

/// Scripted human answers used by demo mode, ending in a termination phrase
pub const DEMO_INPUTS: &[&str] = &[
    "Keep the first version small - I care most about it working end to end.",
    "Lean toward the simple option wherever there is a trade-off. No new infrastructure.",
    "Follow the existing patterns in the repo, same naming and file layout.",
    "done",
];

/// Deterministic response generator, indexed by agent turn number
#[derive(Clone, Copy, Debug, Default)]
pub struct FallbackScript;

impl FallbackScript {
    /// Produce the scripted response for the given 1-based agent turn
    ///
    /// `history` is the conversation so far; the recap on the final turn
    /// quotes the human answers out of it.
    pub fn respond(&self, turn: usize, history: &[Message], feature_request: &str) -> String {
        debug!(turn, history_len = history.len(), "FallbackScript::respond");
        match turn {
            1 => format!(
                "I couldn't reach the live engineering agent, so let's work through this \
                 directly.\n\nFeature request: {}\n\nWhat is the single most important thing \
                 this feature must do on day one - the part you'd demo first?",
                feature_request.trim()
            ),
            2 => "Got it. There's usually a spectrum here:\n\n\
                  Minimal & shippable \u{25C6}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{25C6} Complete & polished\n\
                  \u{2192} less surface, faster feedback      \u{2192} fewer follow-ups, more risk up front\n\n\
                  Where on that spectrum should the first version land, and what is explicitly \
                  out of scope?"
                .to_string(),
            3 => "Understood. Last one: are there existing patterns, modules, or conventions in \
                  this repository the implementation must follow, or constraints it must not \
                  violate?"
                .to_string(),
            _ => {
                let mut response = String::from(
                    "That covers what I need. Decisions recorded so far:\n\n",
                );
                let mut any = false;
                for (i, decision) in history
                    .iter()
                    .filter(|m| m.role == Role::Human)
                    .enumerate()
                {
                    any = true;
                    response.push_str(&format!("{}. {}\n", i + 1, decision.text.trim()));
                }
                if !any {
                    response.push_str("(no explicit decisions were recorded)\n");
                }
                response.push_str(&format!(
                    "\n{} - I have enough to generate the spec document.",
                    TERMINATION_MARKER
                ));
                response
            }
        }
    }
}

/// Degraded repository summary used when the explore agent fails
///
/// A shallow directory listing is deterministic and never fails, which is
/// all the guarantee the pipeline needs to keep moving.
pub fn fallback_repo_summary(repo_path: &Path) -> String {
    debug!(path = %repo_path.display(), "fallback_repo_summary");
    let mut entries: Vec<String> = std::fs::read_dir(repo_path)
        .map(|dir| {
            dir.filter_map(|entry| entry.ok())
                .filter_map(|entry| {
                    let name = entry.file_name().to_string_lossy().to_string();
                    if name.starts_with('.') {
                        None
                    } else if entry.path().is_dir() {
                        Some(format!("{}/", name))
                    } else {
                        Some(name)
                    }
                })
                .collect()
        })
        .unwrap_or_default();
    entries.sort();

    let mut summary = format!(
        "Automated analysis was unavailable; this is a structural listing of {}.\n\n",
        repo_path.display()
    );
    if entries.is_empty() {
        summary.push_str("The repository appears to be empty or unreadable.\n");
    } else {
        summary.push_str("Top-level entries:\n");
        for entry in entries.iter().take(40) {
            summary.push_str(&format!("- {}\n", entry));
        }
    }
    summary
}
