//! Engineer stage - the decision-forcing conversation turn loop
//!
//! Alternates agent turns with human input until the agent emits the
//! termination marker, the human types a termination phrase, the agent-turn
//! budget runs out, or the run is cancelled. The loop suspends only at the
//! input rendezvous; cancellation is honored there and at the post-turn
//! check, so a turn already in flight finishes and is discarded.
//!
//! An agent failure flips the stage permanently onto the scripted fallback;
//! there is no retry against the live agent within a run.

use std::collections::VecDeque;

use tracing::{debug, info, warn};

use super::controller::{PipelineController, PipelineError};
use super::rendezvous::HumanInput;
use crate::agent::script::{self, FallbackScript};
use crate::agent::{ToolGrant, TurnRequest};
use crate::prompts;
use crate::session::{EngineerOutcome, SessionId, WorkerDescriptor, WorkerKind};

/// Progress string published while suspended at the rendezvous. The TUI
/// keys input enablement off this exact value.
pub const WAITING_FOR_INPUT: &str = "Waiting for your input";

/// Per-run mutable loop state
struct TurnLoop<'a> {
    ctrl: &'a PipelineController,
    worker: WorkerDescriptor,
    session: Option<SessionId>,
    fallback: bool,
    agent_turns: u32,
    reached_marker: bool,
}

pub(crate) async fn run(
    ctrl: &PipelineController,
    repo_summary: String,
) -> Result<EngineerOutcome, PipelineError> {
    let feature_request = ctrl.config.feature_request.clone();
    debug!(feature = %feature_request, "engineer stage starting");

    let mut worker = WorkerDescriptor::new(WorkerKind::Engineer);
    worker.set_running("Thinking...");
    ctrl.bus.worker(&worker);
    ctrl.bus
        .activity("Starting the engineering conversation", "\u{1F4AC}");

    let mut turn_loop = TurnLoop {
        ctrl,
        worker,
        session: None,
        fallback: false,
        agent_turns: 0,
        reached_marker: false,
    };
    let mut demo_queue: Option<VecDeque<String>> = ctrl
        .config
        .scripted_inputs
        .clone()
        .map(VecDeque::from);

    let opening = prompts::initial_engineer_prompt(&repo_summary, &feature_request);
    turn_loop.agent_turn(&opening, &feature_request).await?;

    while !turn_loop.reached_marker && turn_loop.agent_turns < ctrl.config.max_turns {
        let input = match &mut demo_queue {
            // Demo mode replaces the rendezvous with a scripted queue
            Some(queue) => queue.pop_front().unwrap_or_else(|| "done".to_string()),
            None => {
                turn_loop.worker.set_running(WAITING_FOR_INPUT);
                ctrl.bus.worker(&turn_loop.worker);
                match ctrl.input.wait().await {
                    HumanInput::Text(text) => text,
                    HumanInput::Cancelled => {
                        info!("engineer stage cancelled at rendezvous");
                        return Err(PipelineError::Cancelled);
                    }
                }
            }
        };

        if script::is_termination_phrase(&input) {
            info!(%input, "session ended by termination phrase");
            break;
        }

        // Recorded only past the phrase check, so "done" and friends never
        // reach the transcript or the decisions of the generated document
        ctrl.push_human_message(&input);
        turn_loop.worker.set_running("Thinking...");
        ctrl.bus.worker(&turn_loop.worker);
        turn_loop.agent_turn(&input, &feature_request).await?;
    }

    if !turn_loop.reached_marker && turn_loop.agent_turns >= ctrl.config.max_turns {
        info!(budget = ctrl.config.max_turns, "agent-turn budget exhausted");
        ctrl.bus.activity(
            "Turn budget reached, moving to document generation",
            "\u{23F3}",
        );
    }

    turn_loop
        .worker
        .set_completed(format!("{} agent turns", turn_loop.agent_turns));
    ctrl.bus.worker(&turn_loop.worker);

    let transcript = ctrl.history_snapshot();
    let decisions = EngineerOutcome::decisions_from(&transcript);
    Ok(EngineerOutcome {
        transcript,
        repo_summary,
        feature_request,
        decisions,
        reached_marker: turn_loop.reached_marker,
    })
}

impl TurnLoop<'_> {
    /// Run one agent turn, appending the response to the transcript
    ///
    /// Fallback is one-way for the run: the first agent failure switches
    /// every subsequent turn to the script, keyed by the running turn count
    /// so scripted pacing stays consistent mid-conversation.
    async fn agent_turn(&mut self, prompt: &str, feature_request: &str) -> Result<(), PipelineError> {
        self.agent_turns += 1;
        debug!(turn = self.agent_turns, fallback = self.fallback, "agent turn");

        let text = if self.fallback {
            FallbackScript.respond(
                self.agent_turns as usize,
                &self.ctrl.history_snapshot(),
                feature_request,
            )
        } else {
            let request = TurnRequest {
                prompt: prompt.to_string(),
                system_prompt: prompts::ENGINEER_SYSTEM.to_string(),
                cwd: self.ctrl.config.repo_path.clone(),
                session: self.session.clone(),
                tools: ToolGrant::Conversation,
            };
            match self.ctrl.executor.run_turn(request).await {
                Ok(output) => {
                    // Never lose a live token to a turn that did not issue one
                    if output.session.is_some() {
                        self.session = output.session;
                    }
                    output.text
                }
                Err(err) => {
                    warn!(%err, "engineer agent failed, switching to scripted fallback");
                    self.ctrl.bus.error("engineer", err.to_string());
                    self.ctrl.bus.activity(
                        "Live agent unavailable, continuing with scripted questions",
                        "\u{26A0}\u{FE0F}",
                    );
                    self.fallback = true;
                    FallbackScript.respond(
                        self.agent_turns as usize,
                        &self.ctrl.history_snapshot(),
                        feature_request,
                    )
                }
            }
        };

        // A cancel that landed while the turn was in flight discards it
        self.ctrl.check_cancelled()?;

        if script::contains_marker(&text) {
            info!(turn = self.agent_turns, "termination marker received");
            self.reached_marker = true;
        }
        self.ctrl.push_agent_message(&text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::agent::{AgentError, MockTurnExecutor, TurnOutput};
    use crate::events::create_event_bus;
    use crate::pipeline::controller::PipelineConfig;
    use crate::session::Role;

    fn ok(text: &str) -> Result<TurnOutput, AgentError> {
        Ok(TurnOutput {
            text: text.to_string(),
            session: SessionId::new("sess-1"),
            num_turns: 1,
        })
    }

    fn err() -> Result<TurnOutput, AgentError> {
        Err(AgentError::EmptyResponse)
    }

    fn scripted_controller(
        outputs: Vec<Result<TurnOutput, AgentError>>,
        inputs: &[&str],
        max_turns: u32,
    ) -> PipelineController {
        let mut config = PipelineConfig::new(std::env::temp_dir(), "add dark mode");
        config.scripted_inputs = Some(inputs.iter().map(|s| s.to_string()).collect());
        config.max_turns = max_turns;
        PipelineController::new(
            Arc::new(MockTurnExecutor::new(outputs)),
            create_event_bus(),
            config,
        )
    }

    #[tokio::test]
    async fn test_marker_ends_conversation() {
        let ctrl = scripted_controller(
            vec![ok("First question?"), ok("Enough. SPEC_READY")],
            &["speed", "unused", "unused"],
            10,
        );
        let outcome = run(&ctrl, "summary".to_string()).await.unwrap();

        assert!(outcome.reached_marker);
        // agent, human, agent
        assert_eq!(outcome.transcript.len(), 3);
        assert_eq!(outcome.decisions.len(), 1);
        assert_eq!(outcome.decisions[0].text, "speed");
    }

    #[tokio::test]
    async fn test_termination_phrase_ends_without_further_turn() {
        let ctrl = scripted_controller(
            vec![ok("First question?"), ok("Second question?")],
            &["speed", "done"],
            10,
        );
        let outcome = run(&ctrl, "summary".to_string()).await.unwrap();

        assert!(!outcome.reached_marker);
        // The phrase triggers no agent turn and stays out of the transcript
        assert_eq!(outcome.transcript.last().unwrap().role, Role::Agent);
        assert_eq!(outcome.transcript.len(), 3);
        assert!(outcome.transcript.iter().all(|m| m.text != "done"));
    }

    #[tokio::test]
    async fn test_termination_phrase_is_not_a_decision() {
        let ctrl = scripted_controller(
            vec![ok("First question?"), ok("Second question?")],
            &["speed", "done"],
            10,
        );
        let outcome = run(&ctrl, "summary".to_string()).await.unwrap();

        assert_eq!(outcome.decisions.len(), 1);
        assert_eq!(outcome.decisions[0].text, "speed");
    }

    #[tokio::test]
    async fn test_budget_caps_agent_turns() {
        // Never emits a marker; every human input is substantive
        let outputs = (0..10).map(|i| ok(&format!("Question {}?", i))).collect();
        let inputs: Vec<String> = (0..12).map(|i| format!("answer {}", i)).collect();
        let input_refs: Vec<&str> = inputs.iter().map(String::as_str).collect();
        let ctrl = scripted_controller(outputs, &input_refs, 3);

        let outcome = run(&ctrl, "summary".to_string()).await.unwrap();
        assert!(!outcome.reached_marker);
        let agent_messages = outcome
            .transcript
            .iter()
            .filter(|m| m.role == Role::Agent)
            .count();
        assert_eq!(agent_messages, 3);
    }

    #[tokio::test]
    async fn test_fallback_is_permanent_after_first_failure() {
        // Turn 1 live, turn 2 fails, turns 3+ must not touch the executor
        let ctrl = scripted_controller(
            vec![ok("First question?"), err(), ok("never reached")],
            &["a", "b", "c", "d"],
            10,
        );
        let outcome = run(&ctrl, "summary".to_string()).await.unwrap();

        // Scripted turn 4 carries the marker, ending the loop
        assert!(outcome.reached_marker);
        assert!(
            outcome
                .transcript
                .iter()
                .all(|m| m.text != "never reached")
        );
    }

    #[tokio::test]
    async fn test_fallback_failure_still_records_agent_message() {
        let ctrl = scripted_controller(vec![err()], &["done"], 10);
        let outcome = run(&ctrl, "summary".to_string()).await.unwrap();

        // The failed turn was replaced by scripted text, not dropped
        assert_eq!(outcome.transcript[0].role, Role::Agent);
        assert!(outcome.transcript[0].text.contains("add dark mode"));
    }

    #[tokio::test]
    async fn test_cancellation_at_rendezvous_unwinds() {
        let mut config = PipelineConfig::new(std::env::temp_dir(), "x");
        config.max_turns = 10;
        let ctrl = Arc::new(PipelineController::new(
            Arc::new(MockTurnExecutor::new(vec![ok("Question?")])),
            create_event_bus(),
            config,
        ));

        let runner = {
            let ctrl = Arc::clone(&ctrl);
            tokio::spawn(async move { run(&ctrl, "summary".to_string()).await })
        };

        // Wait until the loop parks at the rendezvous, then cancel
        for _ in 0..100 {
            if ctrl.awaiting_input() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert!(ctrl.awaiting_input());
        ctrl.cancel();

        let result = runner.await.unwrap();
        assert!(matches!(result, Err(PipelineError::Cancelled)));
    }
}
