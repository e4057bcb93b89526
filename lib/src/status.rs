use std::fmt;

use serde::{Deserialize, Serialize};

/// Terminal-or-not state of a [`crate::Task`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    InProgress,
    Completed,
    Failed,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::InProgress => "in_progress",
            Status::Completed => "completed",
            Status::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Terminal-failure cause. `None` is the only value compatible with
/// `Status::InProgress`/`Status::Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    None,
    AuthError,
    MissingSource,
    InvalidSourceType,
    CorruptedSource,
    Storage,
    Cancelled,
    CompilationErrors,
    NetworkError,
    Docker,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Reason::None => "none",
            Reason::AuthError => "auth_error",
            Reason::MissingSource => "missing_source",
            Reason::InvalidSourceType => "invalid_source_type",
            Reason::CorruptedSource => "corrupted_source",
            Reason::Storage => "storage",
            Reason::Cancelled => "cancelled",
            Reason::CompilationErrors => "compilation_errors",
            Reason::NetworkError => "network_error",
            Reason::Docker => "docker",
        };
        write!(f, "{s}")
    }
}
