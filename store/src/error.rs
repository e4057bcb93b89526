#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no object at key {0}")]
    DoesNotExist(String),
    #[error("object store request failed: {0}")]
    RequestFailed(String),
    #[error("object store is unreachable: {0}")]
    Unavailable(String),
}
