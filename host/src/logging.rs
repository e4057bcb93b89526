use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::FmtSubscriber;

/// Installs the global tracing subscriber, grounded on
/// `raiko-host::main::subscribe_log`: `RUST_LOG`-style filter, optional
/// daily-rolling JSON file appender. The returned guard must be held for
/// the process lifetime or buffered log lines are dropped on exit.
pub fn subscribe_log(log_level: &str, log_path: &Option<PathBuf>, max_log_days: usize) -> Option<WorkerGuard> {
    let subscriber_builder = FmtSubscriber::builder()
        .with_env_filter(log_level.to_string())
        .with_test_writer();

    match log_path {
        Some(log_path) => {
            let file_appender = tracing_appender::rolling::Builder::new()
                .rotation(tracing_appender::rolling::Rotation::DAILY)
                .filename_prefix("texcompile-host.log")
                .max_log_files(max_log_days)
                .build(log_path)
                .expect("initializing rolling file appender failed");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let subscriber = subscriber_builder.json().with_writer(non_blocking).finish();
            tracing::subscriber::set_global_default(subscriber).unwrap();
            Some(guard)
        }
        None => {
            let subscriber = subscriber_builder.finish();
            tracing::subscriber::set_global_default(subscriber).unwrap();
            None
        }
    }
}
