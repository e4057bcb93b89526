use std::sync::Arc;

use texcompile_lib::{task_id as compute_task_id, validation, Reason, Task};
use texcompile_queue::{Queue, TaskRequest};
use texcompile_runner::{CompileOptions, Runner};
use texcompile_source::Source;
use texcompile_store::Store;

use crate::classify::{classify_runner_error, classify_source_error};
use crate::config::WorkerConfig;
use crate::metrics;
use crate::scratch::ScratchDir;

/// Executes one compilation job end-to-end: the Task Worker collaborator
/// (spec §4.2). Single entry point `do_compile`, grounded on
/// `compiler.py::do_compile`.
#[derive(Clone)]
pub struct Worker {
    queue: Arc<dyn Queue>,
    store: Arc<dyn Store>,
    source: Arc<dyn Source>,
    runner: Arc<dyn Runner>,
    config: WorkerConfig,
}

impl Worker {
    pub fn new(
        queue: Arc<dyn Queue>,
        store: Arc<dyn Store>,
        source: Arc<dyn Source>,
        runner: Arc<dyn Runner>,
        config: WorkerConfig,
    ) -> Self {
        Self { queue, store, source, runner, config }
    }

    /// Pops the next queued job, if any. Exposed so the polling loop can
    /// run it on a blocking thread without reaching into `self.queue`.
    pub fn next_pending(
        &self,
    ) -> Result<Option<(String, TaskRequest)>, texcompile_queue::QueueError> {
        self.queue.next_pending()
    }

    /// Retrieves a source package, compiles it, and stores the result.
    /// Always returns a `Task`; errors from collaborators are translated
    /// into a failure `Reason` exactly once, here (spec §7). The queue's
    /// result cell is published with this `Task` embedded regardless of
    /// whether compilation succeeded, mirroring Celery's `SUCCESS` state
    /// always carrying `task.to_dict()`.
    pub async fn do_compile(&self, request: TaskRequest) -> Task {
        let task_id = compute_task_id(&request.source_id, &request.checksum, request.output_format);
        tracing::debug!(
            "do compile for {} @ {} to {}",
            request.source_id,
            request.checksum,
            request.output_format
        );

        if let Ok(existing) = self
            .store
            .get_status(&request.source_id, &request.checksum, request.output_format)
            .await
        {
            if existing.is_terminal() {
                tracing::debug!("{task_id} already has a terminal record, skipping");
                let _ = self.queue.mark_success(&task_id, existing.clone());
                return existing;
            }
        }

        metrics::inc_in_flight();
        let started = std::time::Instant::now();
        let task = self.run(&request).await;
        metrics::dec_in_flight();
        metrics::observe_duration(request.output_format.ext(), started.elapsed());
        metrics::observe_attempt(request.output_format.ext(), &task.reason.to_string());

        self.finalize_status(&task).await;
        let _ = self.queue.mark_success(&task_id, task.clone());
        task
    }

    async fn run(&self, request: &TaskRequest) -> Task {
        let owner = request.owner.clone();
        let base = Task::in_progress(
            &request.source_id,
            &request.checksum,
            request.output_format,
            owner.clone(),
        );

        if let Err(e) = validation::validate_source_id(&request.source_id)
            .and_then(|_| validation::validate_checksum(&request.checksum))
        {
            return base.failed(Reason::InvalidSourceType, e.to_string());
        }

        let scratch = match ScratchDir::create(&self.config.worker_source_root, &base.task_id()) {
            Ok(scratch) => scratch,
            Err(e) => {
                tracing::error!("failed to create scratch directory: {e}");
                return base.failed(Reason::Docker, format!("could not allocate workspace: {e}"));
            }
        };

        let source_package = match self
            .source
            .get_source_content(&request.source_id, &request.token, scratch.path())
            .await
        {
            Ok(pkg) => pkg,
            Err(e) => {
                let reason = classify_source_error(&e);
                let description = describe_source_failure(reason);
                tracing::error!("fetch failed for {}: {e}", request.source_id);
                return base.failed(reason, description);
            }
        };
        tracing::debug!("{} etag: {}", request.source_id, source_package.etag);

        if self.config.verify_checksum
            && !texcompile_lib::validation::checksum_matches_etag(
                &request.checksum,
                &source_package.etag,
            )
        {
            return base.failed(
                Reason::MissingSource,
                "retrieved source does not match the requested checksum",
            );
        }

        if !self.runner.is_available().await {
            return base.failed(Reason::Docker, "Converter is not available");
        }

        let host_workspace = match texcompile_runner::translate_to_host_path(
            scratch.path(),
            &self.config.worker_source_root,
            &self.config.dind_source_root,
        ) {
            Some(path) => path,
            None => {
                tracing::error!(
                    "scratch path {} is not under worker_source_root {}",
                    scratch.path().display(),
                    self.config.worker_source_root.display()
                );
                return base.failed(Reason::Docker, "workspace path translation failed");
            }
        };

        let mut options = CompileOptions::new(
            &request.source_id,
            &request.checksum,
            request.output_format,
        );
        options.stamp_label = request.stamp_label.clone();
        options.stamp_link = request.stamp_link.clone();
        options.timeout_secs = self.config.compile_timeout_secs;
        options.layout = self.config.dvips_layout.clone();
        options.verbose = self.config.verbose_compile;
        options.stamp_disabled = false;

        let completed = match self.runner.run(&host_workspace, scratch.path(), &options).await {
            Ok(completed) => completed,
            Err(e) => {
                let reason = classify_runner_error(&e);
                tracing::error!("compile failed for {}: {e}", request.source_id);
                return base.failed(reason, e.to_string());
            }
        };

        let Some(artifact_path) = completed.artifact.clone() else {
            return base.failed(Reason::CompilationErrors, "Failed");
        };

        let artifact = match tokio::fs::read(&artifact_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!("could not read compiled artifact {}: {e}", artifact_path.display());
                return base.failed(Reason::CompilationErrors, "Failed");
            }
        };
        let size_bytes = artifact.len() as u64;
        let log = match &completed.log {
            Some(log_path) => tokio::fs::read(log_path).await.ok(),
            None => None,
        };

        if let Err(e) = self
            .store
            .store(&request.source_id, &request.checksum, request.output_format, artifact)
            .await
        {
            tracing::error!("failed to store result: {e}");
            return base.failed(Reason::Storage, "Failed to store result");
        }
        if let Some(log) = log {
            if let Err(e) = self
                .store
                .store_log(&request.source_id, &request.checksum, request.output_format, log)
                .await
            {
                tracing::error!("failed to store log: {e}");
                return base.failed(Reason::Storage, "Failed to store result");
            }
        }

        base.completed(size_bytes)
    }

    /// Writes the final status record, retrying once on failure (spec §9
    /// open question, resolved to exactly one extra attempt, no backoff).
    async fn finalize_status(&self, task: &Task) {
        if let Err(e) = self.store.set_status(task).await {
            tracing::error!(
                "failed to write final status for {}: {e}, retrying once",
                task.task_id()
            );
            if let Err(e2) = self.store.set_status(task).await {
                tracing::error!(
                    "final status write failed again for {}: {e2}, giving up",
                    task.task_id()
                );
            }
        }
    }
}

fn describe_source_failure(reason: Reason) -> &'static str {
    match reason {
        Reason::AuthError => "There was a problem authorizing your request.",
        Reason::MissingSource => "Could not retrieve a matching source package",
        Reason::NetworkError => "There was a problem retrieving your source files.",
        _ => "There was a problem retrieving your source files.",
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use texcompile_lib::{Format, SourcePackage, Status};
    use texcompile_queue::MemoryQueue;
    use texcompile_runner::RunnerError;
    use texcompile_source::SourceError;
    use texcompile_store::MemoryStore;

    use super::*;

    struct StubSource {
        etag: String,
        error: Option<SourceError>,
    }

    #[async_trait::async_trait]
    impl Source for StubSource {
        async fn is_available(&self) -> bool {
            true
        }

        async fn get_source_content(
            &self,
            source_id: &str,
            _token: &str,
            save_to: &Path,
        ) -> Result<SourcePackage, SourceError> {
            if let Some(e) = &self.error {
                return Err(clone_source_error(e));
            }
            std::fs::write(save_to.join("main.tex"), b"\\documentclass{article}").unwrap();
            Ok(SourcePackage {
                source_id: source_id.to_string(),
                local_path: save_to.to_path_buf(),
                etag: self.etag.clone(),
            })
        }

        async fn owner(
            &self,
            _source_id: &str,
            _checksum: &str,
            _token: &str,
        ) -> Result<Option<String>, SourceError> {
            Ok(None)
        }
    }

    fn clone_source_error(e: &SourceError) -> SourceError {
        match e {
            SourceError::NotFound(s) => SourceError::NotFound(s.clone()),
            SourceError::RequestUnauthorized(s) => SourceError::RequestUnauthorized(s.clone()),
            other => SourceError::RequestFailed(other.to_string()),
        }
    }

    struct StubRunner {
        available: bool,
        produce_artifact: bool,
    }

    #[async_trait::async_trait]
    impl Runner for StubRunner {
        async fn is_available(&self) -> bool {
            self.available
        }

        async fn run(
            &self,
            _host_workspace: &Path,
            local_workspace: &Path,
            _options: &CompileOptions,
        ) -> Result<texcompile_runner::CompletedRun, RunnerError> {
            if !self.produce_artifact {
                return Ok(texcompile_runner::CompletedRun {
                    exit_code: 1,
                    stdout: b"compile failed".to_vec(),
                    artifact: None,
                    log: None,
                });
            }
            let cache_dir = local_workspace.join("tex_cache");
            std::fs::create_dir_all(&cache_dir).unwrap();
            let artifact_path = cache_dir.join("main.pdf");
            std::fs::write(&artifact_path, b"%PDF-1.5 fake").unwrap();

            let log_dir = local_workspace.join("tex_logs");
            std::fs::create_dir_all(&log_dir).unwrap();
            let log_path = log_dir.join("autotex.log");
            std::fs::write(&log_path, b"compiled ok").unwrap();

            Ok(texcompile_runner::CompletedRun {
                exit_code: 0,
                stdout: b"compiled ok".to_vec(),
                artifact: Some(artifact_path),
                log: Some(log_path),
            })
        }
    }

    fn harness(
        instance_id: &str,
        etag: &str,
        source_error: Option<SourceError>,
        runner_available: bool,
        produce_artifact: bool,
    ) -> (Worker, Arc<MemoryStore>, tempfile::TempDir) {
        let root = tempfile::tempdir().unwrap();
        let worker_source_root = root.path().to_path_buf();
        let queue: Arc<dyn Queue> = Arc::new(MemoryQueue::new(instance_id));
        let store = Arc::new(MemoryStore::new(instance_id));
        let source: Arc<dyn Source> = Arc::new(StubSource { etag: etag.to_string(), error: source_error });
        let runner: Arc<dyn Runner> =
            Arc::new(StubRunner { available: runner_available, produce_artifact });
        let config = WorkerConfig {
            worker_source_root: worker_source_root.clone(),
            dind_source_root: worker_source_root,
            ..WorkerConfig::default()
        };
        let worker = Worker::new(queue, store.clone(), source, runner, config);
        (worker, store, root)
    }

    fn request(checksum: &str) -> TaskRequest {
        TaskRequest {
            source_id: "54".to_string(),
            checksum: checksum.to_string(),
            output_format: Format::Pdf,
            stamp_label: None,
            stamp_link: None,
            token: "tok".to_string(),
            owner: None,
        }
    }

    #[tokio::test]
    async fn successful_compile_stores_artifact_and_returns_completed_task() {
        let (worker, store, _root) = harness(
            "successful_compile_stores_artifact_and_returns_completed_task",
            "chk",
            None,
            true,
            true,
        );
        let task = worker.do_compile(request("chk")).await;
        assert_eq!(task.status, Status::Completed);
        assert!(task.size_bytes > 0);

        let artifact = store.retrieve("54", "chk", Format::Pdf).await.unwrap();
        assert_eq!(artifact.stream, b"%PDF-1.5 fake".to_vec());
        let log = store.retrieve_log("54", "chk", Format::Pdf).await.unwrap();
        assert_eq!(log.stream, b"compiled ok".to_vec());
    }

    #[tokio::test]
    async fn checksum_mismatch_fails_with_missing_source() {
        let (worker, _store, _root) = harness(
            "checksum_mismatch_fails_with_missing_source",
            "other-etag",
            None,
            true,
            true,
        );
        let task = worker.do_compile(request("chk")).await;
        assert_eq!(task.status, Status::Failed);
        assert_eq!(task.reason, Reason::MissingSource);
    }

    #[tokio::test]
    async fn source_not_found_classifies_as_missing_source() {
        let (worker, _store, _root) = harness(
            "source_not_found_classifies_as_missing_source",
            "chk",
            Some(SourceError::NotFound("no such source".to_string())),
            true,
            true,
        );
        let task = worker.do_compile(request("chk")).await;
        assert_eq!(task.status, Status::Failed);
        assert_eq!(task.reason, Reason::MissingSource);
    }

    #[tokio::test]
    async fn runner_unavailable_fails_with_docker_reason() {
        let (worker, _store, _root) = harness(
            "runner_unavailable_fails_with_docker_reason",
            "chk",
            None,
            false,
            true,
        );
        let task = worker.do_compile(request("chk")).await;
        assert_eq!(task.status, Status::Failed);
        assert_eq!(task.reason, Reason::Docker);
    }

    #[tokio::test]
    async fn missing_artifact_fails_with_compilation_errors() {
        let (worker, _store, _root) = harness(
            "missing_artifact_fails_with_compilation_errors",
            "chk",
            None,
            true,
            false,
        );
        let task = worker.do_compile(request("chk")).await;
        assert_eq!(task.status, Status::Failed);
        assert_eq!(task.reason, Reason::CompilationErrors);
    }

    #[tokio::test]
    async fn rerunning_a_terminal_task_is_idempotent() {
        let (worker, store, _root) = harness(
            "rerunning_a_terminal_task_is_idempotent",
            "chk",
            None,
            true,
            true,
        );
        let first = worker.do_compile(request("chk")).await;
        assert_eq!(first.status, Status::Completed);

        // Corrupt the stored record's byte count to prove the second call
        // short-circuits on it rather than recompiling.
        let mut tampered = first.clone();
        tampered.size_bytes = 999;
        store.set_status(&tampered).await.unwrap();

        let second = worker.do_compile(request("chk")).await;
        assert_eq!(second.size_bytes, 999);
    }
}
