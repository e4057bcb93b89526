use std::path::Path;

use bollard::container::{
    Config, LogOutput, LogsOptions, RemoveContainerOptions, WaitContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::models::HostConfig;
use bollard::Docker;
use futures_util::stream::StreamExt;
use texcompile_lib::Format;

use crate::error::RunnerError;
use crate::options::CompileOptions;
use crate::output::discover_output;

/// Credentials for a private converter image registry (e.g. a short-lived
/// ECR token pair). Implementors decide how the pair is sourced and how
/// often it is refreshed; the runner calls `credentials()` once per pull.
pub trait RegistryCredentials: Send + Sync {
    fn credentials(&self) -> Option<(String, String)>;
}

/// A `RegistryCredentials` that never authenticates; used for local
/// development against an unauthenticated registry or a pre-pulled image.
pub struct NoCredentials;

impl RegistryCredentials for NoCredentials {
    fn credentials(&self) -> Option<(String, String)> {
        None
    }
}

/// Marker strings the converter image writes to stderr when it has
/// determined the source itself is unusable, as opposed to a transient
/// or environmental failure (spec §4.3).
const CORRUPTED_SOURCE_MARKERS: &[&str] = &[
    "No TeX source files found",
    "source package is corrupted",
    "unrecognized archive format",
];

pub struct CompletedRun {
    pub exit_code: i64,
    pub stdout: Vec<u8>,
    pub artifact: Option<std::path::PathBuf>,
    pub log: Option<std::path::PathBuf>,
}

/// The Converter Runner collaborator (spec §4.3): bind-mounts a workspace,
/// runs the converter image, and classifies its output. `ConverterRunner`
/// is the Docker-backed production implementation; worker/host integration
/// tests substitute a stub that never touches the Docker API.
#[async_trait::async_trait]
pub trait Runner: Send + Sync {
    async fn is_available(&self) -> bool;

    async fn run(
        &self,
        host_workspace: &Path,
        local_workspace: &Path,
        options: &CompileOptions,
    ) -> Result<CompletedRun, RunnerError>;
}

/// Drives the converter image via the Docker Engine API.
pub struct ConverterRunner {
    docker: Docker,
    image: String,
    pull_on_run: bool,
    credentials: Box<dyn RegistryCredentials>,
}

impl ConverterRunner {
    pub fn connect(image: impl Into<String>, pull_on_run: bool) -> Result<Self, RunnerError> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| RunnerError::Docker(e.to_string()))?;
        Ok(Self {
            docker,
            image: image.into(),
            pull_on_run,
            credentials: Box::new(NoCredentials),
        })
    }

    pub fn with_credentials(mut self, credentials: Box<dyn RegistryCredentials>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Pings the Docker daemon. `false` on any connection or protocol error.
    pub async fn is_available(&self) -> bool {
        self.docker.ping().await.is_ok()
    }

    async fn pull_image_if_needed(&self) -> Result<(), RunnerError> {
        if !self.pull_on_run {
            return Ok(());
        }
        let credentials = self
            .credentials
            .credentials()
            .map(|(username, password)| bollard::auth::DockerCredentials {
                username: Some(username),
                password: Some(password),
                ..Default::default()
            });
        let options = Some(CreateImageOptions {
            from_image: self.image.as_str(),
            ..Default::default()
        });
        let mut stream = self.docker.create_image(options, None, credentials);
        while let Some(result) = stream.next().await {
            result.map_err(|e| RunnerError::Docker(e.to_string()))?;
        }
        Ok(())
    }

    /// Runs the converter once against `host_workspace` (already translated
    /// to a path the Docker daemon itself can resolve, see `path::translate_to_host_path`)
    /// bound at `/autotex`, with `options` as its command line.
    pub async fn run(
        &self,
        host_workspace: &Path,
        local_workspace: &Path,
        options: &CompileOptions,
    ) -> Result<CompletedRun, RunnerError> {
        self.pull_image_if_needed().await?;

        let host_config = HostConfig {
            binds: Some(vec![format!(
                "{}:/autotex",
                host_workspace.to_string_lossy()
            )]),
            auto_remove: Some(false),
            ..Default::default()
        };
        let config = Config {
            image: Some(self.image.clone()),
            cmd: Some(options.to_args()),
            host_config: Some(host_config),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            ..Default::default()
        };

        let container = self
            .docker
            .create_container::<String, String>(None, config)
            .await
            .map_err(|e| RunnerError::Docker(e.to_string()))?;

        let result = self.run_created(&container.id, options.output_format, local_workspace).await;

        let _ = self
            .docker
            .remove_container(
                &container.id,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await;

        result
    }

    async fn run_created(
        &self,
        container_id: &str,
        output_format: Format,
        local_workspace: &Path,
    ) -> Result<CompletedRun, RunnerError> {
        self.docker
            .start_container::<String>(container_id, None)
            .await
            .map_err(|e| RunnerError::Docker(e.to_string()))?;

        let mut wait_stream = self.docker.wait_container(
            container_id,
            Some(WaitContainerOptions {
                condition: "not-running",
            }),
        );
        let mut exit_code = 0i64;
        while let Some(result) = wait_stream.next().await {
            match result {
                Ok(response) => exit_code = response.status_code,
                Err(bollard::errors::Error::DockerContainerWaitError { code, .. }) => {
                    exit_code = code;
                }
                Err(e) => return Err(RunnerError::Docker(e.to_string())),
            }
        }

        let stdout = self.collect_logs(container_id).await?;

        if contains_corruption_marker(&stdout) {
            return Err(RunnerError::CorruptedSource(
                "converter reported an unrecoverable source error".to_string(),
            ));
        }

        let (artifact, log) = discover_output(local_workspace, output_format, &stdout)
            .map_err(|e| RunnerError::Docker(format!("output discovery failed: {e}")))?;

        Ok(CompletedRun {
            exit_code,
            stdout,
            artifact,
            log,
        })
    }

    async fn collect_logs(&self, container_id: &str) -> Result<Vec<u8>, RunnerError> {
        let options = Some(LogsOptions::<String> {
            stdout: true,
            stderr: true,
            ..Default::default()
        });
        let mut stream = self.docker.logs(container_id, options);
        let mut buf = Vec::new();
        while let Some(chunk) = stream.next().await {
            match chunk.map_err(|e| RunnerError::Docker(e.to_string()))? {
                LogOutput::StdOut { message } | LogOutput::StdErr { message } => {
                    buf.extend_from_slice(&message);
                }
                _ => {}
            }
        }
        Ok(buf)
    }
}

#[async_trait::async_trait]
impl Runner for ConverterRunner {
    async fn is_available(&self) -> bool {
        ConverterRunner::is_available(self).await
    }

    async fn run(
        &self,
        host_workspace: &Path,
        local_workspace: &Path,
        options: &CompileOptions,
    ) -> Result<CompletedRun, RunnerError> {
        ConverterRunner::run(self, host_workspace, local_workspace, options).await
    }
}

fn contains_corruption_marker(stdout: &[u8]) -> bool {
    let text = String::from_utf8_lossy(stdout);
    CORRUPTED_SOURCE_MARKERS
        .iter()
        .any(|marker| text.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_known_corruption_markers() {
        assert!(contains_corruption_marker(
            b"autotex: No TeX source files found in package"
        ));
        assert!(!contains_corruption_marker(b"compilation succeeded"));
    }
}
