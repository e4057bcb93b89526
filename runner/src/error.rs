#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("converter detected a corrupted or malicious source: {0}")]
    CorruptedSource(String),
    #[error("container runtime error: {0}")]
    Docker(String),
}
