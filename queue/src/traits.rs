use texcompile_lib::Task;

use crate::{error::QueueError, request::TaskRequest, state::QueueState};

/// The queue/result-backend collaborator described as external in spec §1:
/// at-least-once FIFO delivery of opaque task payloads, deterministic
/// task-id lookup, and a durable per-task result cell.
///
/// Implementations provided here (memory, Redis) make the workspace
/// runnable end-to-end; a production deployment may substitute any backend
/// that upholds these semantics.
pub trait Queue: Send + Sync {
    /// Submit a job keyed by `task_id`. Sets its state to `Sent`.
    fn enqueue(&self, task_id: &str, request: TaskRequest) -> Result<(), QueueError>;

    /// `None` means `task_id` has never been submitted (Celery `PENDING`).
    fn get_state(&self, task_id: &str) -> Result<Option<QueueState>, QueueError>;

    /// Pop the next `Sent` job in FIFO order and mark it `Started`. Returns
    /// `None` when no job is waiting.
    fn next_pending(&self) -> Result<Option<(String, TaskRequest)>, QueueError>;

    fn mark_retry(&self, task_id: &str) -> Result<(), QueueError>;
    fn mark_success(&self, task_id: &str, task: Task) -> Result<(), QueueError>;
    fn mark_failure(&self, task_id: &str, message: String) -> Result<(), QueueError>;

    /// Pings the backend; used by `is_available` health probes.
    fn ping(&self) -> Result<(), QueueError>;
}
