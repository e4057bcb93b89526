#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no such task: {0}")]
    NoSuchTask(String),
    #[error("failed to create task: {0}")]
    TaskCreationFailed(String),
}
