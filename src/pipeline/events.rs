use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::task::TaskFailure;

/// Events that drive task state transitions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum TaskEvent {
    /// Begin executing the task's work
    Start,
    /// Settle the task with a result value
    Complete(Value),
    /// Settle the task with a failure cause
    Fail(TaskFailure),
    /// Cancel the task
    Cancel,
}

impl TaskEvent {
    /// String representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Complete(_) => "complete",
            Self::Fail(_) => "fail",
            Self::Cancel => "cancel",
        }
    }

    /// Check if this event settles the task
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Start)
    }

    /// Extract the failure cause if this is a failure event
    pub fn failure_cause(&self) -> Option<&TaskFailure> {
        match self {
            Self::Fail(cause) => Some(cause),
            _ => None,
        }
    }
}
