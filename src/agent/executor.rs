//! TurnExecutor trait definition

use async_trait::async_trait;

use super::error::AgentError;
use super::types::{TurnOutput, TurnRequest};

/// Stateless turn executor - each call is one independent exchange
///
/// This is the core abstraction over the external agent capability. Every
/// invocation is a pure request/response: the executor retains no state
/// between calls, and conversational memory exists only through the
/// continuation token the caller threads explicitly. Implementations must
/// never retry internally; retry/fallback policy belongs to the pipeline
/// stages.
#[async_trait]
pub trait TurnExecutor: Send + Sync {
    /// Run exactly one conversational turn
    ///
    /// Returns the final accumulated assistant text plus any continuation
    /// token. Tool-use notices emitted during the turn go to the event bus
    /// side channel and are not part of this contract.
    async fn run_turn(&self, request: TurnRequest) -> Result<TurnOutput, AgentError>;
}

#[cfg(test)]
pub mod mock {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tracing::debug;

    use super::*;

    /// Mock turn executor for unit tests - returns canned outputs in order
    pub struct MockTurnExecutor {
        outputs: Vec<Result<TurnOutput, AgentError>>,
        call_count: AtomicUsize,
    }

    impl MockTurnExecutor {
        pub fn new(outputs: Vec<Result<TurnOutput, AgentError>>) -> Self {
            debug!(output_count = outputs.len(), "MockTurnExecutor::new");
            Self {
                outputs,
                call_count: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TurnExecutor for MockTurnExecutor {
        async fn run_turn(&self, _request: TurnRequest) -> Result<TurnOutput, AgentError> {
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
            debug!(idx, "MockTurnExecutor::run_turn");
            match self.outputs.get(idx) {
                Some(Ok(output)) => Ok(output.clone()),
                Some(Err(_)) => Err(AgentError::EmptyResponse),
                None => Err(AgentError::Malformed("no more mock outputs".to_string())),
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_returns_outputs_in_order() {
            let executor = MockTurnExecutor::new(vec![
                Ok(TurnOutput {
                    text: "first".to_string(),
                    session: None,
                    num_turns: 1,
                }),
                Ok(TurnOutput {
                    text: "second".to_string(),
                    session: None,
                    num_turns: 1,
                }),
            ]);

            let request = TurnRequest {
                prompt: "hello".to_string(),
                system_prompt: String::new(),
                cwd: std::env::temp_dir(),
                session: None,
                tools: Default::default(),
            };

            let out = executor.run_turn(request.clone()).await.unwrap();
            assert_eq!(out.text, "first");
            let out = executor.run_turn(request).await.unwrap();
            assert_eq!(out.text, "second");
            assert_eq!(executor.call_count(), 2);
        }

        #[tokio::test]
        async fn test_mock_errors_when_exhausted() {
            let executor = MockTurnExecutor::new(vec![]);
            let request = TurnRequest {
                prompt: "hello".to_string(),
                system_prompt: String::new(),
                cwd: std::env::temp_dir(),
                session: None,
                tools: Default::default(),
            };
            assert!(executor.run_turn(request).await.is_err());
        }
    }
}
