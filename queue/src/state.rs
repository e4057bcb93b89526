use serde::{Deserialize, Serialize};
use texcompile_lib::{impl_display_using_json_pretty, Task};

/// Mirrors the states a Celery `AsyncResult` can report, per the worker's
/// original state machine (spec §4.1's `get` mapping). The absence of a
/// `QueueState` for a `task_id` (i.e. `Pending`) is represented as `None`
/// at the call site rather than as a variant here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueueState {
    Sent,
    Started,
    Retry,
    Failure { message: String },
    Success { task: Task },
}

impl_display_using_json_pretty!(QueueState);

impl QueueState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, QueueState::Failure { .. } | QueueState::Success { .. })
    }
}
