use serde::{Deserialize, Serialize};
use std::fmt;

use super::events::TaskEvent;

/// Lifecycle states of a pipeline task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Initial state when the task is registered
    Pending,
    /// Task work is currently executing
    Running,
    /// Task produced a value
    Complete,
    /// Task terminated with a failure cause
    Failed,
    /// Task was cancelled before producing an outcome
    Cancelled,
}

impl TaskState {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed | Self::Cancelled)
    }

    /// Check if this is an active state (work is in flight)
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Check if this state satisfies downstream dependencies
    pub fn satisfies_dependencies(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Complete => write!(f, "complete"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for TaskState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "complete" => Ok(Self::Complete),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Invalid task state: {s}")),
        }
    }
}

impl Default for TaskState {
    fn default() -> Self {
        Self::Pending
    }
}

/// Error returned when an event is not legal in the current state
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid transition from {from} on {event}")]
pub struct InvalidTransition {
    pub from: TaskState,
    pub event: &'static str,
}

/// Determine the target state for an event, or reject the transition.
///
/// Terminal states accept no further events; the first terminal event wins.
/// `Pending -> Complete` and `Pending -> Failed` are legal because a task can
/// be settled by propagation before its own work ever starts.
pub fn transition(current: TaskState, event: &TaskEvent) -> Result<TaskState, InvalidTransition> {
    let target = match (current, event) {
        (TaskState::Pending, TaskEvent::Start) => TaskState::Running,
        (TaskState::Pending, TaskEvent::Complete(_)) => TaskState::Complete,
        (TaskState::Pending, TaskEvent::Fail(_)) => TaskState::Failed,
        (TaskState::Pending, TaskEvent::Cancel) => TaskState::Cancelled,

        (TaskState::Running, TaskEvent::Complete(_)) => TaskState::Complete,
        (TaskState::Running, TaskEvent::Fail(_)) => TaskState::Failed,
        (TaskState::Running, TaskEvent::Cancel) => TaskState::Cancelled,

        (from, event) => {
            return Err(InvalidTransition {
                from,
                event: event.event_type(),
            })
        }
    };

    Ok(target)
}
