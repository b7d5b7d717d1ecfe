//! Crystallize stage - turn the session into a spec document on disk
//!
//! Primary path: one write-enabled agent turn asked to author the document
//! itself. Whether it actually wrote is detected through the tool-use side
//! channel, not the turn's return text. Fallback path: deterministic
//! template rendering. Only the final filesystem write can fail the stage.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::controller::PipelineController;
use crate::agent::{ToolGrant, TurnRequest};
use crate::events::PipelineEvent;
use crate::prompts;
use crate::render;
use crate::session::{EngineerOutcome, WorkerDescriptor, WorkerKind};

#[derive(Debug, Error)]
pub enum CrystallizeError {
    #[error("failed to render spec document")]
    Render(#[from] handlebars::RenderError),
    #[error("failed to write spec document to {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub(crate) async fn run(
    ctrl: &PipelineController,
    outcome: &EngineerOutcome,
) -> Result<PathBuf, CrystallizeError> {
    let output_path = ctrl.output_path();
    debug!(output = %output_path.display(), "crystallize stage starting");

    let mut worker = WorkerDescriptor::new(WorkerKind::Crystallizer);
    worker.set_running("Writing the spec document...");
    ctrl.bus.worker(&worker);
    ctrl.bus
        .activity("Crystallizing decisions into a spec document", "\u{1F4DD}");

    // Subscribe before the turn so no tool notice can slip past
    let mut notices = ctrl.bus.subscribe();

    let request = TurnRequest {
        prompt: prompts::crystallize_prompt(outcome, &output_path),
        system_prompt: prompts::CRYSTALLIZE_SYSTEM.to_string(),
        cwd: ctrl.config.repo_path.clone(),
        session: None,
        tools: ToolGrant::Write,
    };

    let agent_wrote = match ctrl.executor.run_turn(request).await {
        Ok(_) => {
            let mut saw_write = false;
            while let Ok(event) = notices.try_recv() {
                if let PipelineEvent::ToolUsed { tool, detail } = event {
                    if tool == "Write" {
                        debug!(%detail, "agent wrote the document itself");
                        saw_write = true;
                    }
                }
            }
            // A claimed write with no file on disk still needs the fallback
            saw_write && output_path.exists()
        }
        Err(err) => {
            warn!(%err, "crystallize agent failed, rendering directly");
            ctrl.bus.error("crystallizer", err.to_string());
            false
        }
    };

    if !agent_wrote {
        ctrl.bus
            .activity("Rendering the spec document directly", "\u{1F4DD}");
        let document = render::render_spec(outcome, &ctrl.config.repo_path)?;
        tokio::fs::write(&output_path, document)
            .await
            .map_err(|source| CrystallizeError::Write {
                path: output_path.clone(),
                source,
            })?;
    }

    info!(path = %output_path.display(), agent_wrote, "spec document ready");
    worker.set_completed(output_path.display().to_string());
    ctrl.bus.worker(&worker);
    ctrl.bus
        .activity(format!("Spec written to {}", output_path.display()), "\u{2705}");
    Ok(output_path)
}
