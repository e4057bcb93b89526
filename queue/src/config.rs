#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Redis connection URL. `None` selects the in-memory backend.
    pub redis_url: Option<String>,
    /// TTL (seconds) applied to each state record.
    pub redis_ttl: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            redis_ttl: 60 * 60 * 24,
        }
    }
}
