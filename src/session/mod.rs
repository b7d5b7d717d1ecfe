//! Domain types for a pipeline run
//!
//! A run produces a transcript of [`Message`]s, advances through [`Phase`]s,
//! and reports per-stage progress via [`WorkerDescriptor`]s. Everything here
//! is pure data; mutation happens in the pipeline layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// Who produced an utterance in the transcript
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Human,
    Agent,
}

impl Role {
    /// Get the uppercase label used in the rendered conversation log
    pub fn log_label(self) -> &'static str {
        match self {
            Role::Human => "USER",
            Role::Agent => "ASSISTANT",
        }
    }
}

/// One utterance in the conversation transcript
///
/// Immutable once created; ordering is insertion order in the run's history.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    /// Unique message id (UUIDv7, time-ordered)
    pub id: Uuid,
    /// Who said it
    pub role: Role,
    /// Text content
    pub text: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a new message with the given role
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            role,
            text: text.into(),
            created_at: Utc::now(),
        }
    }

    /// Create a human message
    pub fn human(text: impl Into<String>) -> Self {
        Self::new(Role::Human, text)
    }

    /// Create an agent message
    pub fn agent(text: impl Into<String>) -> Self {
        Self::new(Role::Agent, text)
    }
}

/// Opaque continuation token returned by the external agent capability
///
/// Supplying it on a later turn resumes the same agent-side context. The
/// engineer stage threads it across turns and never overwrites a non-empty
/// token with an empty one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap a raw token. Returns None for empty tokens so callers can never
    /// thread an empty continuation by accident.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.is_empty() {
            debug!("SessionId::new: rejecting empty token");
            None
        } else {
            Some(Self(raw))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Process-wide pipeline phase, owned by the controller
///
/// Monotonically advances within a run; resets to Idle between runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Idle,
    Explore,
    Engineer,
    Crystallize,
    Complete,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Explore => "explore",
            Phase::Engineer => "engineer",
            Phase::Crystallize => "crystallize",
            Phase::Complete => "complete",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which delegated unit of work a descriptor belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerKind {
    Explorer,
    Engineer,
    Crystallizer,
}

impl WorkerKind {
    /// Stable worker id for status updates
    pub fn id(self) -> &'static str {
        match self {
            WorkerKind::Explorer => "explorer",
            WorkerKind::Engineer => "engineer",
            WorkerKind::Crystallizer => "crystallizer",
        }
    }

    /// Human-readable name for the activity panel
    pub fn display_name(self) -> &'static str {
        match self {
            WorkerKind::Explorer => "RepoExplorer",
            WorkerKind::Engineer => "VibeEngineer",
            WorkerKind::Crystallizer => "Crystallizer",
        }
    }
}

/// Status of one delegated unit of work
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Error,
}

impl WorkerStatus {
    /// Completed and Error are terminal; a descriptor never leaves them
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkerStatus::Completed | WorkerStatus::Error)
    }
}

/// Observable status record for one delegated unit of work
///
/// Created when a stage begins, republished on every status change, terminal
/// once status reaches Completed or Error.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkerDescriptor {
    pub id: String,
    pub kind: WorkerKind,
    pub status: WorkerStatus,
    /// Human-readable progress string ("Thinking...", "Waiting for your input")
    pub progress: Option<String>,
    /// Output summary once completed
    pub output: Option<String>,
    /// Error string once failed
    pub error: Option<String>,
}

impl WorkerDescriptor {
    /// Create an idle descriptor for the given kind
    pub fn new(kind: WorkerKind) -> Self {
        debug!(kind = kind.id(), "WorkerDescriptor::new");
        Self {
            id: kind.id().to_string(),
            kind,
            status: WorkerStatus::Idle,
            progress: None,
            output: None,
            error: None,
        }
    }

    /// Transition to Running with a progress note
    pub fn set_running(&mut self, progress: impl Into<String>) {
        debug_assert!(!self.status.is_terminal(), "worker already terminal");
        self.status = WorkerStatus::Running;
        self.progress = Some(progress.into());
    }

    /// Transition to the terminal Completed state
    pub fn set_completed(&mut self, output: impl Into<String>) {
        self.status = WorkerStatus::Completed;
        self.progress = None;
        self.output = Some(output.into());
    }

    /// Transition to the terminal Error state
    pub fn set_error(&mut self, error: impl Into<String>) {
        self.status = WorkerStatus::Error;
        self.progress = None;
        self.error = Some(error.into());
    }
}

/// One recorded decision, extracted verbatim from a human turn
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Decision {
    /// 1-based position among the run's human turns
    pub index: usize,
    pub text: String,
}

/// Everything the engineer stage hands to the crystallizer
#[derive(Clone, Debug)]
pub struct EngineerOutcome {
    /// Full ordered conversation history for the run
    pub transcript: Vec<Message>,
    /// Repository summary produced by the explore stage
    pub repo_summary: String,
    /// Original feature request
    pub feature_request: String,
    /// Decisions extracted from the human turns, in order
    pub decisions: Vec<Decision>,
    /// True when the session ended via the termination marker rather than a
    /// termination phrase, cancellation, or the turn budget
    pub reached_marker: bool,
}

impl EngineerOutcome {
    /// Extract the decision list from a transcript (one per human turn)
    pub fn decisions_from(transcript: &[Message]) -> Vec<Decision> {
        transcript
            .iter()
            .filter(|m| m.role == Role::Human)
            .enumerate()
            .map(|(i, m)| Decision {
                index: i + 1,
                text: m.text.clone(),
            })
            .collect()
    }
}
