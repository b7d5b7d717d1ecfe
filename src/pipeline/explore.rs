//! Explore stage - one read-only agent turn over the repository
//!
//! Produces the repository summary the rest of the run builds on. This
//! stage cannot fail the pipeline: when the agent is unavailable it
//! degrades to a structural directory listing.

use tracing::{debug, warn};

use super::controller::PipelineController;
use crate::agent::script::fallback_repo_summary;
use crate::agent::{ToolGrant, TurnRequest};
use crate::prompts;
use crate::session::{WorkerDescriptor, WorkerKind};

pub(crate) async fn run(ctrl: &PipelineController) -> String {
    let repo_path = &ctrl.config.repo_path;
    debug!(repo = %repo_path.display(), "explore stage starting");

    let mut worker = WorkerDescriptor::new(WorkerKind::Explorer);
    worker.set_running("Analyzing repository...");
    ctrl.bus.worker(&worker);
    ctrl.bus
        .activity(format!("Analyzing {}", repo_path.display()), "\u{1F50D}");

    let request = TurnRequest {
        prompt: prompts::EXPLORE.to_string(),
        system_prompt: prompts::EXPLORE_SYSTEM.to_string(),
        cwd: repo_path.clone(),
        session: None,
        tools: ToolGrant::ReadOnly,
    };

    let summary = match ctrl.executor.run_turn(request).await {
        Ok(output) => output.text,
        Err(err) => {
            warn!(%err, "explore agent failed, using structural listing");
            ctrl.bus.error("explorer", err.to_string());
            ctrl.bus.activity(
                "Analysis agent unavailable, using a structural listing",
                "\u{26A0}\u{FE0F}",
            );
            fallback_repo_summary(repo_path)
        }
    };

    worker.set_completed(format!("{} chars of analysis", summary.chars().count()));
    ctrl.bus.worker(&worker);
    ctrl.bus
        .activity("Repository analysis complete", "\u{2705}");
    summary
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::agent::{MockTurnExecutor, TurnOutput};
    use crate::events::create_event_bus;
    use crate::pipeline::controller::PipelineConfig;

    fn controller(executor: MockTurnExecutor, dir: &std::path::Path) -> PipelineController {
        PipelineController::new(
            Arc::new(executor),
            create_event_bus(),
            PipelineConfig::new(dir.to_path_buf(), "feature"),
        )
    }

    #[tokio::test]
    async fn test_explore_returns_agent_analysis() {
        let dir = tempfile::tempdir().unwrap();
        let executor = MockTurnExecutor::new(vec![Ok(TurnOutput {
            text: "A Rust workspace with three crates.".to_string(),
            session: None,
            num_turns: 3,
        })]);
        let ctrl = controller(executor, dir.path());

        let summary = run(&ctrl).await;
        assert_eq!(summary, "A Rust workspace with three crates.");
    }

    #[tokio::test]
    async fn test_explore_degrades_to_listing_on_agent_failure() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]").unwrap();
        // Empty mock: every call errors
        let ctrl = controller(MockTurnExecutor::new(vec![]), dir.path());

        let summary = run(&ctrl).await;
        assert!(summary.contains("- Cargo.toml"));
    }
}
