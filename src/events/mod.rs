//! Event boundary between the pipeline and its observers
//!
//! One-directional push model: the pipeline publishes [`PipelineEvent`]s on
//! the [`EventBus`]; the TUI and tests subscribe. Inbound control (input
//! submission, cancellation) goes through the controller API instead.

mod bus;
mod types;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventBus, create_event_bus};
pub use types::PipelineEvent;
