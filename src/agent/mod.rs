//! Turn Executor abstraction over the external agent capability
//!
//! One turn = one request/response exchange. The [`ClaudeTurnExecutor`]
//! backs the trait with the `claude` CLI; [`script::FallbackScript`]
//! provides the deterministic substitute used when live invocations fail.

mod claude;
mod error;
mod executor;
pub mod script;
mod types;

pub use claude::ClaudeTurnExecutor;
pub use error::AgentError;
pub use executor::TurnExecutor;
pub use types::{ToolGrant, TurnOutput, TurnRequest};

#[cfg(test)]
pub use executor::mock::MockTurnExecutor;
