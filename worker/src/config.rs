use std::path::PathBuf;

/// Worker-side configuration (spec §4.2, §4.3, §6). Mirrors the
/// "configuration object" re-architecture guidance in spec §9: no secrets
/// or roots are read at import time, everything flows through this value.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Directory under which the worker creates per-task scratch directories.
    pub worker_source_root: PathBuf,
    /// Same volume as `worker_source_root`, as seen by the converter host.
    pub dind_source_root: PathBuf,
    /// When set, the retrieved etag is verified against the requested
    /// checksum before compiling. Spec §4.2 item 1 permits disabling this.
    pub verify_checksum: bool,
    pub verbose_compile: bool,
    pub compile_timeout_secs: u32,
    pub dvips_layout: String,
    /// Extra attempts made to persist the final status record on failure.
    /// Spec §9 open question, resolved to exactly one retry, no backoff.
    pub status_write_retries: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_source_root: PathBuf::from("/tmp/texcompile/worker"),
            dind_source_root: PathBuf::from("/tmp/texcompile/worker"),
            verify_checksum: true,
            verbose_compile: false,
            compile_timeout_secs: 600,
            dvips_layout: "letter".to_string(),
            status_write_retries: 1,
        }
    }
}
