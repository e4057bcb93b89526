use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use texcompile_queue::QueueConfig;
use texcompile_source::SourceConfig;
use texcompile_store::StoreConfig;
use texcompile_worker::WorkerConfig;

use crate::error::{HostError, HostResult};

fn default_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_concurrency_limit() -> usize {
    64
}

fn default_max_worker_concurrency() -> usize {
    num_cpus::get()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_config_path() -> PathBuf {
    PathBuf::from("host/config/config.json")
}

fn default_source_endpoint() -> String {
    "http://localhost:8000".to_string()
}

fn default_converter_image() -> String {
    "texcompile/converter:latest".to_string()
}

fn default_worker_source_root() -> PathBuf {
    PathBuf::from("/tmp/texcompile/worker")
}

/// Process configuration, following `raiko-host::Cli`'s
/// clap-derive-plus-file-merge pattern: CLI flags / env vars take
/// precedence, a JSON config file fills in the rest, nothing is read at
/// import time.
#[derive(Clone, Serialize, Deserialize, Debug, Parser)]
#[command(name = "texcompile-host", about = "TeX compilation cache service", long_about = None)]
#[serde(default)]
pub struct Cli {
    #[arg(long, env = "BIND_ADDRESS", default_value = "0.0.0.0:8080")]
    #[serde(default = "default_address")]
    pub bind_address: String,

    #[arg(long, env = "CONCURRENCY_LIMIT", default_value = "64")]
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,

    #[arg(long, env = "MAX_WORKER_CONCURRENCY")]
    #[serde(default = "default_max_worker_concurrency")]
    pub max_worker_concurrency: usize,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[arg(long, env = "LOG_PATH")]
    pub log_path: Option<PathBuf>,

    #[arg(long, default_value = "host/config/config.json")]
    #[serde(default = "default_config_path")]
    config_path: PathBuf,

    #[arg(long, env = "SOURCE_ENDPOINT", default_value = "http://localhost:8000")]
    #[serde(default = "default_source_endpoint")]
    pub source_endpoint: String,

    #[arg(long, env = "SOURCE_VERIFY_TLS", default_value = "true")]
    #[serde(default = "default_true")]
    pub source_verify_tls: bool,

    #[arg(long, env = "CHECKSUM_VERIFICATION_ENABLED", default_value = "true")]
    #[serde(default = "default_true")]
    pub checksum_verification_enabled: bool,

    #[arg(long, env = "STORE_BUCKET", default_value = "texcompile")]
    #[serde(default = "default_store_bucket")]
    pub store_bucket: String,

    #[arg(long, env = "STORE_ENDPOINT")]
    pub store_endpoint: Option<String>,

    #[arg(long, env = "STORE_REGION")]
    pub store_region: Option<String>,

    #[arg(long, env = "STORE_ACCESS_KEY_ID")]
    pub store_access_key_id: Option<String>,

    #[arg(long, env = "STORE_SECRET_ACCESS_KEY")]
    pub store_secret_access_key: Option<String>,

    #[arg(long, env = "CONVERTER_IMAGE", default_value = "texcompile/converter:latest")]
    #[serde(default = "default_converter_image")]
    pub converter_image: String,

    #[arg(long, env = "CONVERTER_PULL_ENABLED", default_value = "false")]
    #[serde(default)]
    pub converter_pull_enabled: bool,

    #[arg(long, env = "WORKER_SOURCE_ROOT", default_value = "/tmp/texcompile/worker")]
    #[serde(default = "default_worker_source_root")]
    pub worker_source_root: PathBuf,

    #[arg(long, env = "DIND_SOURCE_ROOT", default_value = "/tmp/texcompile/worker")]
    #[serde(default = "default_worker_source_root")]
    pub dind_source_root: PathBuf,

    #[arg(long, env = "VERBOSE_COMPILE", default_value = "false")]
    #[serde(default)]
    pub verbose_compile: bool,

    #[arg(long, env = "QUEUE_URL")]
    pub queue_url: Option<String>,

    /// Vault address for registry-credential injection (§4.3's trait seam).
    /// No Vault-backed `RegistryCredentials` implementation ships yet; when
    /// unset the runner uses `NoCredentials`.
    #[arg(long, env = "VAULT_ADDR")]
    pub vault_addr: Option<String>,

    #[arg(long, env = "VAULT_TOKEN")]
    pub vault_token: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_store_bucket() -> String {
    "texcompile".to_string()
}

impl Default for Cli {
    fn default() -> Self {
        // Only reachable via `Parser::parse`'s default-value wiring in
        // practice; kept so `serde(default)` has a concrete fallback.
        Cli::parse_from(["texcompile-host"])
    }
}

impl Cli {
    /// Reads `self.config_path` (if present) and merges it underneath the
    /// already-parsed CLI/env values, matching `raiko-host::Cli::merge_from_file`.
    pub fn merge_from_file(&mut self) -> HostResult<()> {
        let Ok(file) = std::fs::File::open(&self.config_path) else {
            return Ok(());
        };
        let reader = std::io::BufReader::new(file);
        let mut config: Value =
            serde_json::from_reader(reader).map_err(|e| HostError::Internal(e.into()))?;
        let this = serde_json::to_value(&self).map_err(|e| HostError::Internal(e.into()))?;
        merge(&mut config, &this);
        *self = serde_json::from_value(config).map_err(|e| HostError::Internal(e.into()))?;
        Ok(())
    }

    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            redis_url: self.queue_url.clone(),
            ..QueueConfig::default()
        }
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            bucket: self.store_bucket.clone(),
            endpoint: self.store_endpoint.clone(),
            region: self.store_region.clone(),
            access_key_id: self.store_access_key_id.clone(),
            secret_access_key: self.store_secret_access_key.clone(),
        }
    }

    pub fn source_config(&self) -> SourceConfig {
        SourceConfig {
            endpoint: self.source_endpoint.clone(),
            verify_tls: self.source_verify_tls,
            ..SourceConfig::default()
        }
    }

    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            worker_source_root: self.worker_source_root.clone(),
            dind_source_root: self.dind_source_root.clone(),
            verify_checksum: self.checksum_verification_enabled,
            verbose_compile: self.verbose_compile,
            ..WorkerConfig::default()
        }
    }
}

/// Merges two JSON values together, overwriting `a` with the values of `b`.
fn merge(a: &mut Value, b: &Value) {
    match (a, b) {
        (Value::Object(a), Value::Object(b)) => {
            for (k, v) in b {
                merge(a.entry(k.clone()).or_insert(Value::Null), v);
            }
        }
        (a, b) if !b.is_null() => *a = b.clone(),
        _ => {}
    }
}
