pub mod config;
pub mod error;
pub mod memory;
pub mod redis_queue;
pub mod request;
pub mod state;
pub mod traits;

pub use config::QueueConfig;
pub use error::QueueError;
pub use memory::MemoryQueue;
pub use redis_queue::RedisQueue;
pub use request::TaskRequest;
pub use state::QueueState;
pub use traits::Queue;

/// Opens the configured backend: Redis when `redis_url` is set, otherwise
/// an in-memory queue private to `instance_id`.
pub fn open(instance_id: &str, config: QueueConfig) -> Result<Box<dyn Queue>, QueueError> {
    if config.redis_url.is_some() {
        Ok(Box::new(RedisQueue::open(config)?))
    } else {
        Ok(Box::new(MemoryQueue::new(instance_id)))
    }
}
