use std::time::Duration;

use backoff::{exponential::ExponentialBackoff, SystemClock};
use redis::Commands;
use texcompile_lib::Task;

use crate::{config::QueueConfig, error::QueueError, request::TaskRequest, state::QueueState, traits::Queue};

const PENDING_LIST_KEY: &str = "texcompile:pending";

fn state_key(task_id: &str) -> String {
    format!("texcompile:state:{task_id}")
}

/// Redis-backed `Queue`: a list for FIFO delivery order, and per-task state
/// keys with TTL for the result cell. Connection retries use the same
/// bounded exponential backoff the teacher's request pool applies to its
/// Redis connection.
pub struct RedisQueue {
    client: redis::Client,
    config: QueueConfig,
}

impl RedisQueue {
    pub fn open(config: QueueConfig) -> Result<Self, QueueError> {
        let url = config
            .redis_url
            .clone()
            .ok_or_else(|| QueueError::Unavailable("no redis_url configured".to_string()))?;
        let client = redis::Client::open(url).map_err(|e| QueueError::Unavailable(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn conn(&self) -> Result<redis::Connection, QueueError> {
        let backoff = ExponentialBackoff::<SystemClock> {
            max_elapsed_time: Some(Duration::from_secs(5)),
            ..Default::default()
        };
        backoff::retry(backoff, || {
            self.client
                .get_connection()
                .map_err(backoff::Error::transient)
        })
        .map_err(|e| QueueError::Unavailable(e.to_string()))
    }
}

impl Queue for RedisQueue {
    fn enqueue(&self, task_id: &str, request: TaskRequest) -> Result<(), QueueError> {
        let mut conn = self.conn()?;
        let payload = serde_json::to_string(&request)
            .map_err(|e| QueueError::Unavailable(e.to_string()))?;
        let entry = format!("{task_id}\u{1}{payload}");
        conn.rpush::<_, _, ()>(PENDING_LIST_KEY, entry)
            .map_err(|e| QueueError::Unavailable(e.to_string()))?;
        conn.set_ex::<_, _, ()>(
            state_key(task_id),
            serde_json::to_string(&QueueState::Sent).unwrap(),
            self.config.redis_ttl,
        )
        .map_err(|e| QueueError::Unavailable(e.to_string()))?;
        Ok(())
    }

    fn get_state(&self, task_id: &str) -> Result<Option<QueueState>, QueueError> {
        let mut conn = self.conn()?;
        let raw: Option<String> = conn
            .get(state_key(task_id))
            .map_err(|e| QueueError::Unavailable(e.to_string()))?;
        match raw {
            None => Ok(None),
            Some(s) => serde_json::from_str(&s)
                .map(Some)
                .map_err(|e| QueueError::Unavailable(e.to_string())),
        }
    }

    fn next_pending(&self) -> Result<Option<(String, TaskRequest)>, QueueError> {
        let mut conn = self.conn()?;
        let entry: Option<String> = conn
            .lpop(PENDING_LIST_KEY, None)
            .map_err(|e| QueueError::Unavailable(e.to_string()))?;
        let Some(entry) = entry else {
            return Ok(None);
        };
        let (task_id, payload) = entry
            .split_once('\u{1}')
            .ok_or_else(|| QueueError::Unavailable("malformed queue entry".to_string()))?;
        let request: TaskRequest =
            serde_json::from_str(payload).map_err(|e| QueueError::Unavailable(e.to_string()))?;
        conn.set_ex::<_, _, ()>(
            state_key(task_id),
            serde_json::to_string(&QueueState::Started).unwrap(),
            self.config.redis_ttl,
        )
        .map_err(|e| QueueError::Unavailable(e.to_string()))?;
        Ok(Some((task_id.to_string(), request)))
    }

    fn mark_retry(&self, task_id: &str) -> Result<(), QueueError> {
        self.set_state(task_id, &QueueState::Retry)
    }

    fn mark_success(&self, task_id: &str, task: Task) -> Result<(), QueueError> {
        self.set_state(task_id, &QueueState::Success { task })
    }

    fn mark_failure(&self, task_id: &str, message: String) -> Result<(), QueueError> {
        self.set_state(task_id, &QueueState::Failure { message })
    }

    fn ping(&self) -> Result<(), QueueError> {
        let mut conn = self.conn()?;
        redis::cmd("PING")
            .query::<String>(&mut conn)
            .map_err(|e| QueueError::Unavailable(e.to_string()))?;
        Ok(())
    }
}

impl RedisQueue {
    fn set_state(&self, task_id: &str, state: &QueueState) -> Result<(), QueueError> {
        let mut conn = self.conn()?;
        conn.set_ex::<_, _, ()>(
            state_key(task_id),
            serde_json::to_string(state).map_err(|e| QueueError::Unavailable(e.to_string()))?,
            self.config.redis_ttl,
        )
        .map_err(|e| QueueError::Unavailable(e.to_string()))?;
        Ok(())
    }
}
