use serde::{Deserialize, Serialize};

use crate::{impl_display_using_json_pretty, Format, Reason, Status};

/// The authoritative record of one compilation attempt. `task_id` is the
/// primary key everywhere: queue slot, storage prefix, and URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub source_id: String,
    pub checksum: String,
    pub output_format: Format,
    pub status: Status,
    pub reason: Reason,
    pub description: String,
    pub size_bytes: u64,
    /// Opaque principal identifying the owner of the source. `None` means
    /// the task is public.
    pub owner: Option<String>,
}

impl_display_using_json_pretty!(Task);

impl Task {
    /// `task_id = "{source_id}/{checksum}/{output_format}"`.
    pub fn task_id(&self) -> String {
        task_id(&self.source_id, &self.checksum, self.output_format)
    }

    pub fn in_progress(
        source_id: impl Into<String>,
        checksum: impl Into<String>,
        output_format: Format,
        owner: Option<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            checksum: checksum.into(),
            output_format,
            status: Status::InProgress,
            reason: Reason::None,
            description: String::new(),
            size_bytes: 0,
            owner,
        }
    }

    pub fn completed(mut self, size_bytes: u64) -> Self {
        self.status = Status::Completed;
        self.reason = Reason::None;
        self.description.clear();
        self.size_bytes = size_bytes;
        self
    }

    pub fn failed(mut self, reason: Reason, description: impl Into<String>) -> Self {
        debug_assert!(reason != Reason::None, "failed task must carry a reason");
        self.status = Status::Failed;
        self.reason = reason;
        self.description = description.into();
        self.size_bytes = 0;
        self
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self.status, Status::InProgress)
    }
}

/// Deterministic task id for a `(source_id, checksum, output_format)` triple.
/// Injective: distinct triples never collide, since `source_id` and
/// `checksum` are validated to exclude the `/` separator.
pub fn task_id(source_id: &str, checksum: &str, output_format: Format) -> String {
    format!("{source_id}/{checksum}/{output_format}")
}

/// A transient value returned by the store on retrieval: a byte stream plus
/// an optional strong etag.
pub struct Product {
    pub stream: Vec<u8>,
    pub etag: Option<String>,
}

/// The result of a source fetch. `local_path` is inside a worker-writable
/// directory that is also reachable from the converter host under a
/// configured root prefix.
#[derive(Debug, Clone)]
pub struct SourcePackage {
    pub source_id: String,
    pub local_path: std::path::PathBuf,
    pub etag: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_id_is_injective_over_distinct_triples() {
        let a = task_id("54", "chk1", Format::Pdf);
        let b = task_id("54", "chk1", Format::Dvi);
        let c = task_id("55", "chk1", Format::Pdf);
        let d = task_id("54", "chk2", Format::Pdf);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn task_id_matches_spec_format() {
        assert_eq!(task_id("54", "a1b2c3d4=", Format::Pdf), "54/a1b2c3d4=/pdf");
    }

    #[test]
    fn completed_clears_failure_state() {
        let task = Task::in_progress("54", "chk", Format::Pdf, None)
            .failed(Reason::Docker, "boom")
            .completed(42);
        assert_eq!(task.status, Status::Completed);
        assert_eq!(task.reason, Reason::None);
        assert_eq!(task.size_bytes, 42);
        assert!(task.description.is_empty());
    }
}
