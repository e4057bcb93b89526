#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("not authorized: {0}")]
    RequestUnauthorized(String),
    #[error("forbidden: {0}")]
    RequestForbidden(String),
    #[error("no such source package: {0}")]
    NotFound(String),
    #[error("source package too large: {0}")]
    Oversize(String),
    #[error("source service request failed: {0}")]
    RequestFailed(String),
    #[error("could not connect to source service: {0}")]
    ConnectionFailed(String),
    #[error("TLS connection failed: {0}")]
    SecurityException(String),
    #[error("derived filename escapes the save directory: {0}")]
    UnsafePath(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
