pub mod classify;
pub mod config;
pub mod metrics;
pub mod scratch;
pub mod worker;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

pub use config::WorkerConfig;
pub use worker::Worker;

/// Polls the queue for pending jobs and drives up to `max_concurrency` of
/// them at once, grounded on `raiko_reqactor::Actor::serve_in_background`.
/// Unlike the broker that loop was built for, `Queue::next_pending` is a
/// synchronous poll rather than a push notification, so an idle worker
/// backs off for `idle_poll_interval` instead of awaiting a `Notify`.
pub async fn serve_in_background(worker: Worker, max_concurrency: usize, idle_poll_interval: Duration) {
    let worker = Arc::new(worker);
    let semaphore = Arc::new(Semaphore::new(max_concurrency));

    loop {
        let next = {
            let w = worker.clone();
            tokio::task::spawn_blocking(move || w.next_pending())
                .await
                .expect("worker poll task panicked")
        };

        let (task_id, request) = match next {
            Ok(Some(pair)) => pair,
            Ok(None) => {
                tokio::time::sleep(idle_poll_interval).await;
                continue;
            }
            Err(e) => {
                tracing::error!("queue poll failed: {e}");
                tokio::time::sleep(idle_poll_interval).await;
                continue;
            }
        };

        let permit = semaphore.clone().acquire_owned().await.expect("semaphore closed");
        let worker = worker.clone();
        tokio::spawn(async move {
            let _permit = permit;
            tracing::debug!("picked up {task_id}");
            let task = worker.do_compile(request).await;
            tracing::debug!("finished {task_id} with status {}", task.status);
        });
    }
}
