//! Human-input rendezvous - a single-slot synchronization primitive
//!
//! The engineer stage suspends here, and only here, while waiting for the
//! human. The slot holds at most one outstanding waiter and one pending
//! resolution: one `wait()`, one `resolve()`. Cancellation is a typed
//! variant, not a reserved string, so no legitimate human text can ever be
//! mistaken for the control signal.

use std::sync::Mutex;

use tokio::sync::oneshot;
use tracing::{debug, warn};

/// What the waiter receives when the rendezvous resolves
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HumanInput {
    /// Text the human submitted
    Text(String),
    /// The run was cancelled; unwind without another agent turn
    Cancelled,
}

/// Single-slot rendezvous between the turn loop and the input source
///
/// Invariant: at most one waiter exists at a time. The turn loop is the
/// only caller of `wait()` and is single-threaded per run, so a second
/// concurrent wait cannot arise; if it ever did, the older waiter resolves
/// to `Cancelled` when its sender is displaced.
#[derive(Debug, Default)]
pub struct InputSlot {
    waiter: Mutex<Option<oneshot::Sender<HumanInput>>>,
}

impl InputSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suspend until input arrives. This is the loop's only suspension point.
    pub async fn wait(&self) -> HumanInput {
        let rx = {
            let mut waiter = self.waiter.lock().expect("input slot poisoned");
            if waiter.is_some() {
                warn!("InputSlot::wait: displacing an existing waiter");
            }
            let (tx, rx) = oneshot::channel();
            *waiter = Some(tx);
            rx
        };
        debug!("InputSlot::wait: suspended");
        // A dropped sender (slot torn down) reads as cancellation
        rx.await.unwrap_or(HumanInput::Cancelled)
    }

    /// Resolve the pending waiter, if any. Returns false when no waiter
    /// exists (the input is dropped, never queued).
    pub fn resolve(&self, input: HumanInput) -> bool {
        let sender = self.waiter.lock().expect("input slot poisoned").take();
        match sender {
            Some(tx) => {
                debug!("InputSlot::resolve: delivering input");
                tx.send(input).is_ok()
            }
            None => {
                debug!("InputSlot::resolve: no pending waiter, dropping input");
                false
            }
        }
    }

    /// Whether a waiter is currently suspended on the slot
    pub fn has_waiter(&self) -> bool {
        self.waiter.lock().expect("input slot poisoned").is_some()
    }
}
