use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::states::TaskState;

/// Stable identifier of a task within its engine's arena.
///
/// Ids are allocated monotonically and never reused for the lifetime of an
/// engine, so dependency edges can be stored as plain index lists.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TaskId(pub(crate) u64);

impl TaskId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Terminal failure cause of a task.
///
/// Failures are values: they are carried through the graph, aggregated by
/// `combine`, and never silently swallowed. A failure nobody observes is
/// surfaced through the engine's unhandled-failure sink.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum TaskFailure {
    /// Handler-level failure with its cause
    #[error("task failed: {0}")]
    Failed(String),

    /// The task did not reach a terminal state within its deadline
    #[error("task timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// The task was cancelled before settling
    #[error("task was cancelled")]
    Cancelled,

    /// A cache round-trip could not be completed
    #[error("cache unavailable: {0}")]
    CacheUnavailable(String),

    /// Aggregate failure from `combine`, enumerating every failed member
    #[error("composite failure: {} task(s) failed", .0.len())]
    Composite(Vec<(TaskId, TaskFailure)>),
}

impl TaskFailure {
    pub fn failed(cause: impl Into<String>) -> Self {
        Self::Failed(cause.into())
    }

    /// Short classification string for structured logging
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Failed(_) => "failed",
            Self::Timeout { .. } => "timeout",
            Self::Cancelled => "cancelled",
            Self::CacheUnavailable(_) => "cache_unavailable",
            Self::Composite(_) => "composite",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Terminal outcome of a task: a shared result value or a failure cause.
pub type TaskOutcome = Result<Arc<Value>, TaskFailure>;

/// Continuation invoked with the task's outcome once it settles.
pub(crate) type Continuation = Box<dyn FnOnce(TaskOutcome) + Send>;

/// Arena slot for a single task.
///
/// Records live in the engine's arena until the task is terminal and the last
/// external handle has been dropped, at which point the slot is reclaimed.
pub(crate) struct TaskRecord {
    pub(crate) state: TaskState,
    /// Set exactly once, when the task reaches a terminal state
    pub(crate) outcome: Option<TaskOutcome>,
    /// Invoked in attachment order when the task settles.
    ///
    /// Wrapped in a `Mutex` solely so the record is `Sync` while holding a
    /// `Box<dyn FnOnce + Send>`; every access happens under the owning
    /// `DashMap` shard's exclusive `get_mut`, so it is reached via `get_mut`
    /// and never actually locked.
    pub(crate) continuations: Mutex<Vec<Continuation>>,
    /// Downstream tasks created by `chain`/`recover`/`combine`/`with_timeout`
    pub(crate) dependents: Vec<TaskId>,
    /// Count of attached continuations, joiners and aggregators
    pub(crate) observers: usize,
    /// All external handles have been dropped
    pub(crate) detached: bool,
    /// Unhandled failure already surfaced to the sink
    pub(crate) reported: bool,
    /// Cooperative cancellation signal for the task's work
    pub(crate) cancel: CancellationToken,
}

impl TaskRecord {
    pub(crate) fn new(cancel: CancellationToken) -> Self {
        Self {
            state: TaskState::Pending,
            outcome: None,
            continuations: Mutex::new(Vec::new()),
            dependents: Vec::new(),
            observers: 0,
            detached: false,
            reported: false,
            cancel,
        }
    }
}
