pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod server;

use std::alloc;
use std::sync::Arc;

use cap::Cap;
use texcompile_dispatch::Dispatch;
use texcompile_queue::Queue;
use texcompile_runner::{ConverterRunner, NoCredentials, Runner};
use texcompile_source::{Source, SourceClient};
use texcompile_store::{ObjectStore, Store};
use texcompile_worker::{Worker, WorkerConfig};
use tracing::info;

pub use config::Cli;
pub use error::{HostError, HostResult};

#[global_allocator]
static ALLOCATOR: Cap<alloc::System> = Cap::new(alloc::System, usize::MAX);

/// Shared, `Clone`-able application state handed to every handler via
/// `axum::extract::State`.
#[derive(Clone)]
pub struct HostState {
    pub dispatch: Dispatch,
    pub store: Arc<dyn Store>,
    pub source: Arc<dyn Source>,
    pub runner: Arc<dyn Runner>,
    pub checksum_verification_enabled: bool,
}

impl HostState {
    /// Wires the production collaborators (Redis or in-memory queue, S3
    /// object store, HTTP source client, Docker converter runner) and
    /// spawns the worker polling loop in the background, matching
    /// `raiko_reqactor::Actor::serve_in_background`'s fire-and-forget
    /// startup shape.
    pub async fn init(cli: &Cli) -> HostResult<Self> {
        let instance_id = format!("texcompile-host-{}", uuid::Uuid::new_v4());
        let queue: Arc<dyn Queue> = Arc::from(
            texcompile_queue::open(&instance_id, cli.queue_config())
                .map_err(|e| HostError::Internal(e.into()))?,
        );
        let object_store = ObjectStore::connect(cli.store_config()).await;
        object_store
            .initialize()
            .await
            .map_err(|e| HostError::Internal(e.into()))?;
        let store: Arc<dyn Store> = Arc::new(object_store);
        let source: Arc<dyn Source> = Arc::new(
            SourceClient::new(cli.source_config()).map_err(|e| HostError::Internal(e.into()))?,
        );

        let mut runner = ConverterRunner::connect(cli.converter_image.clone(), cli.converter_pull_enabled)
            .map_err(|e| HostError::Internal(e.into()))?;
        if let (Some(_), Some(_)) = (&cli.vault_addr, &cli.vault_token) {
            // No Vault-backed `RegistryCredentials` ships yet (DESIGN.md);
            // the trait seam is wired and ready for one.
            runner = runner.with_credentials(Box::new(NoCredentials));
        }
        let runner: Arc<dyn Runner> = Arc::new(runner);

        let worker = Worker::new(
            queue.clone(),
            store.clone(),
            source.clone(),
            runner.clone(),
            cli.worker_config(),
        );
        let max_concurrency = cli.max_worker_concurrency.max(1);
        info!("starting worker loop with max_concurrency={max_concurrency}");
        tokio::spawn(texcompile_worker::serve_in_background(
            worker,
            max_concurrency,
            std::time::Duration::from_millis(250),
        ));

        Ok(Self {
            dispatch: Dispatch::new(queue, store.clone()),
            store,
            source,
            runner,
            checksum_verification_enabled: cli.checksum_verification_enabled,
        })
    }
}

/// Test-only constructor wiring in-memory collaborators; exported so
/// `texcompile-host/tests/` integration tests never touch Docker, S3, or
/// the network.
#[cfg(any(test, feature = "test-util"))]
pub mod test_util {
    use std::path::Path;
    use std::sync::Arc;

    use async_trait::async_trait;
    use texcompile_lib::SourcePackage;
    use texcompile_queue::MemoryQueue;
    use texcompile_runner::{CompletedRun, CompileOptions, RunnerError};
    use texcompile_source::SourceError;
    use texcompile_store::MemoryStore;

    use super::*;

    /// A `Source` double that always succeeds, returning an etag equal to
    /// the requested checksum so the worker's dual-equality check passes.
    pub struct StubSource;

    #[async_trait]
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
            let local_path = save_to.join(format!("{source_id}.tar.gz"));
            tokio::fs::write(&local_path, b"stub source").await?;
            Ok(SourcePackage {
                source_id: source_id.to_string(),
                local_path,
                etag: "STUB_ETAG".to_string(),
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

    /// A `Runner` double that always reports available and produces a
    /// fixed-content artifact plus log.
    pub struct StubRunner;

    #[async_trait]
    impl Runner for StubRunner {
        async fn is_available(&self) -> bool {
            true
        }

        async fn run(
            &self,
            _host_workspace: &Path,
            local_workspace: &Path,
            options: &CompileOptions,
        ) -> Result<CompletedRun, RunnerError> {
            let cache_dir = local_workspace.join("tex_cache");
            let log_dir = local_workspace.join("tex_logs");
            let to_docker_err = |e: std::io::Error| RunnerError::Docker(e.to_string());
            tokio::fs::create_dir_all(&cache_dir).await.map_err(to_docker_err)?;
            tokio::fs::create_dir_all(&log_dir).await.map_err(to_docker_err)?;
            let artifact = cache_dir.join(format!("{}.{}", options.source_id, options.output_format.ext()));
            tokio::fs::write(&artifact, b"stub artifact bytes").await.map_err(to_docker_err)?;
            let log = log_dir.join("autotex.log");
            tokio::fs::write(&log, b"stub compile log").await.map_err(to_docker_err)?;
            Ok(CompletedRun {
                exit_code: 0,
                stdout: Vec::new(),
                artifact: Some(artifact),
                log: Some(log),
            })
        }
    }

    pub fn state(instance_id: &str) -> HostState {
        let queue: Arc<dyn Queue> = Arc::new(MemoryQueue::new(instance_id));
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new(instance_id));
        let source: Arc<dyn Source> = Arc::new(StubSource);
        let runner: Arc<dyn Runner> = Arc::new(StubRunner);

        let worker = Worker::new(
            queue.clone(),
            store.clone(),
            source.clone(),
            runner.clone(),
            WorkerConfig {
                worker_source_root: std::env::temp_dir().join(instance_id),
                dind_source_root: std::env::temp_dir().join(instance_id),
                ..WorkerConfig::default()
            },
        );
        tokio::spawn(texcompile_worker::serve_in_background(
            worker,
            4,
            std::time::Duration::from_millis(10),
        ));

        HostState {
            dispatch: Dispatch::new(queue, store.clone()),
            store,
            source,
            runner,
            checksum_verification_enabled: true,
        }
    }
}
