use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use lazy_static::lazy_static;
use texcompile_lib::Task;

use crate::{error::QueueError, request::TaskRequest, state::QueueState, traits::Queue};

struct Inner {
    states: HashMap<String, QueueState>,
    pending: VecDeque<(String, TaskRequest)>,
}

impl Inner {
    fn new() -> Self {
        Self {
            states: HashMap::new(),
            pending: VecDeque::new(),
        }
    }
}

lazy_static! {
    /// Keyed by an arbitrary instance id so that parallel tests (and
    /// multiple in-process `MemoryQueue`s) don't collide, mirroring the
    /// isolation pattern used for the teacher's in-memory request pool.
    static ref GLOBAL_STORAGE: Mutex<HashMap<String, Mutex<Inner>>> = Mutex::new(HashMap::new());
}

/// An in-memory `Queue` implementation, used when no external queue/result
/// backend is configured. Not durable across process restarts.
pub struct MemoryQueue {
    instance_id: String,
}

impl MemoryQueue {
    pub fn new(instance_id: impl Into<String>) -> Self {
        let instance_id = instance_id.into();
        GLOBAL_STORAGE
            .lock()
            .unwrap()
            .entry(instance_id.clone())
            .or_insert_with(|| Mutex::new(Inner::new()));
        Self { instance_id }
    }

    fn with_inner<T>(&self, f: impl FnOnce(&mut Inner) -> T) -> T {
        let storage = GLOBAL_STORAGE.lock().unwrap();
        let inner = storage
            .get(&self.instance_id)
            .expect("instance registered in constructor");
        let mut inner = inner.lock().unwrap();
        f(&mut inner)
    }
}

impl Queue for MemoryQueue {
    fn enqueue(&self, task_id: &str, request: TaskRequest) -> Result<(), QueueError> {
        self.with_inner(|inner| {
            inner
                .states
                .insert(task_id.to_string(), QueueState::Sent);
            inner.pending.push_back((task_id.to_string(), request));
        });
        Ok(())
    }

    fn get_state(&self, task_id: &str) -> Result<Option<QueueState>, QueueError> {
        Ok(self.with_inner(|inner| inner.states.get(task_id).cloned()))
    }

    fn next_pending(&self) -> Result<Option<(String, TaskRequest)>, QueueError> {
        Ok(self.with_inner(|inner| {
            let next = inner.pending.pop_front();
            if let Some((task_id, _)) = &next {
                inner
                    .states
                    .insert(task_id.clone(), QueueState::Started);
            }
            next
        }))
    }

    fn mark_retry(&self, task_id: &str) -> Result<(), QueueError> {
        self.with_inner(|inner| {
            inner.states.insert(task_id.to_string(), QueueState::Retry);
        });
        Ok(())
    }

    fn mark_success(&self, task_id: &str, task: Task) -> Result<(), QueueError> {
        self.with_inner(|inner| {
            inner
                .states
                .insert(task_id.to_string(), QueueState::Success { task });
        });
        Ok(())
    }

    fn mark_failure(&self, task_id: &str, message: String) -> Result<(), QueueError> {
        self.with_inner(|inner| {
            inner
                .states
                .insert(task_id.to_string(), QueueState::Failure { message });
        });
        Ok(())
    }

    fn ping(&self) -> Result<(), QueueError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use texcompile_lib::Format;

    fn request() -> TaskRequest {
        TaskRequest {
            source_id: "54".to_string(),
            checksum: "chk".to_string(),
            output_format: Format::Pdf,
            stamp_label: None,
            stamp_link: None,
            token: "tok".to_string(),
            owner: None,
        }
    }

    #[test]
    fn unknown_task_id_is_pending() {
        let q = MemoryQueue::new("unknown_task_id_is_pending");
        assert_eq!(q.get_state("nope").unwrap(), None);
    }

    #[test]
    fn enqueue_then_dequeue_transitions_sent_to_started() {
        let q = MemoryQueue::new("enqueue_then_dequeue_transitions_sent_to_started");
        q.enqueue("54/chk/pdf", request()).unwrap();
        assert_eq!(q.get_state("54/chk/pdf").unwrap(), Some(QueueState::Sent));

        let (task_id, _) = q.next_pending().unwrap().unwrap();
        assert_eq!(task_id, "54/chk/pdf");
        assert_eq!(
            q.get_state("54/chk/pdf").unwrap(),
            Some(QueueState::Started)
        );
    }

    #[test]
    fn fifo_order_preserved_across_multiple_jobs() {
        let q = MemoryQueue::new("fifo_order_preserved_across_multiple_jobs");
        q.enqueue("a", request()).unwrap();
        q.enqueue("b", request()).unwrap();
        let (first, _) = q.next_pending().unwrap().unwrap();
        let (second, _) = q.next_pending().unwrap().unwrap();
        assert_eq!(first, "a");
        assert_eq!(second, "b");
    }

    #[test]
    fn instances_are_isolated_by_id() {
        let a = MemoryQueue::new("instances_are_isolated_by_id_a");
        let b = MemoryQueue::new("instances_are_isolated_by_id_b");
        a.enqueue("x", request()).unwrap();
        assert_eq!(b.get_state("x").unwrap(), None);
    }
}
