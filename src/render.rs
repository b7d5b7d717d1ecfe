//! Deterministic spec-document rendering
//!
//! The crystallizer's fallback path: renders the full output document from
//! the engineering session without any agent involvement, using an embedded
//! handlebars template. Section order is fixed; decision previews are
//! truncated to a bounded length.

use std::path::Path;

use chrono::Utc;
use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

use crate::agent::script::TERMINATION_MARKER;
use crate::session::EngineerOutcome;

/// Embedded document template
const SPEC_TEMPLATE: &str = include_str!("../templates/spec.hbs");

/// Maximum characters of a human turn quoted in a Technical Decisions entry
pub const DECISION_PREVIEW_LIMIT: usize = 200;

#[derive(Serialize)]
struct DecisionEntry {
    index: usize,
    preview: String,
}

#[derive(Serialize)]
struct TranscriptEntry {
    role_label: &'static str,
    text: String,
}

#[derive(Serialize)]
struct SpecDocData {
    feature_request: String,
    repo_path: String,
    repo_summary: String,
    generated: String,
    decisions: Vec<DecisionEntry>,
    transcript: Vec<TranscriptEntry>,
    footer: String,
}

/// Truncate a decision to the preview limit, appending an ellipsis marker
/// when text was dropped. Operates on characters, never mid-code-point.
pub fn truncate_decision(text: &str) -> String {
    let mut chars = text.chars();
    let preview: String = chars.by_ref().take(DECISION_PREVIEW_LIMIT).collect();
    if chars.next().is_some() {
        format!("{}...", preview)
    } else {
        preview
    }
}

/// Render the complete spec document for an engineering session
pub fn render_spec(outcome: &EngineerOutcome, repo_path: &Path) -> Result<String, handlebars::RenderError> {
    debug!(
        decisions = outcome.decisions.len(),
        messages = outcome.transcript.len(),
        "render_spec"
    );

    let footer = if outcome.reached_marker {
        format!("*Generated by distill - {} (session reached natural termination)*", TERMINATION_MARKER)
    } else {
        "*Generated by distill - session ended before the agent signaled readiness*".to_string()
    };

    let data = SpecDocData {
        feature_request: outcome.feature_request.clone(),
        repo_path: repo_path.display().to_string(),
        repo_summary: outcome.repo_summary.clone(),
        generated: Utc::now().format("%Y-%m-%d").to_string(),
        decisions: outcome
            .decisions
            .iter()
            .map(|d| DecisionEntry {
                index: d.index,
                preview: truncate_decision(&d.text),
            })
            .collect(),
        transcript: outcome
            .transcript
            .iter()
            .map(|m| TranscriptEntry {
                role_label: m.role.log_label(),
                text: m.text.clone(),
            })
            .collect(),
        footer,
    };

    let mut registry = Handlebars::new();
    registry.register_escape_fn(handlebars::no_escape);
    registry.render_template(SPEC_TEMPLATE, &data)
}
