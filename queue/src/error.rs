#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("queue backend unavailable: {0}")]
    Unavailable(String),
    #[error("task {0} already has a terminal record")]
    AlreadyTerminal(String),
}
