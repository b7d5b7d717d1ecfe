//! Pipeline orchestration
//!
//! The controller sequences the three stages of a run and owns the shared
//! run state; each stage lives in its own module. Observers follow a run
//! through the event bus, not through return values.

mod controller;
mod crystallize;
mod engineer;
mod explore;
mod rendezvous;

pub use controller::{
    DEFAULT_MAX_TURNS, PipelineConfig, PipelineController, PipelineError, PipelineResult,
};
pub use crystallize::CrystallizeError;
pub use engineer::WAITING_FOR_INPUT;
pub use rendezvous::{HumanInput, InputSlot};
