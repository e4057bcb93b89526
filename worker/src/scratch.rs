use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Scoped acquisition of a worker-exclusive scratch directory. The
/// directory is removed on drop regardless of how the worker execution
/// exits, satisfying the "finally clause" requirement (spec §4.2) without
/// explicit early-return bookkeeping.
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Creates `{worker_source_root}/{sanitized task_id}-{counter}`.
    pub fn create(worker_source_root: &Path, task_id: &str) -> std::io::Result<Self> {
        std::fs::create_dir_all(worker_source_root)?;
        let leaf = format!("{}-{}", sanitize(task_id), next_suffix());
        let path = worker_source_root.join(leaf);
        std::fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => tracing::debug!("cleaned up {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::error!("could not clean up {}: {e}", self.path.display()),
        }
    }
}

fn sanitize(task_id: &str) -> String {
    task_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect()
}

fn next_suffix() -> u64 {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_and_removes_directory_on_drop() {
        let root = tempdir().unwrap();
        let path = {
            let scratch = ScratchDir::create(root.path(), "54/chk/pdf").unwrap();
            assert!(scratch.path().is_dir());
            scratch.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn sanitizes_task_id_for_use_as_a_path_component() {
        let root = tempdir().unwrap();
        let scratch = ScratchDir::create(root.path(), "54/chk/pdf").unwrap();
        let leaf = scratch.path().file_name().unwrap().to_str().unwrap();
        assert!(!leaf.contains('/'));
    }
}
