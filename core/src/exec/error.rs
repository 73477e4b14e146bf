use thiserror::Error;

/// What the executor did about the process tree of a command it gave up on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupReport {
    /// Only the direct child (local shell or ssh client) was killed.
    ChildKilled,
    /// A process-group termination request was issued.
    ProcessGroup { pgid: u32, delivered: bool },
    /// Group cleanup was requested but the group id was never learned.
    Unavailable { reason: String },
}

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("invalid host spec '{spec}': {reason}")]
    InvalidHost { spec: String, reason: String },
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed while waiting for command: {0}")]
    Wait(#[source] std::io::Error),
    #[error("command timed out after {timeout_seconds}s ({cleanup:?})")]
    TimedOut {
        timeout_seconds: u64,
        cleanup: CleanupReport,
    },
    #[error("command cancelled ({cleanup:?})")]
    Cancelled { cleanup: CleanupReport },
}

impl ExecError {
    pub fn cleanup(&self) -> Option<&CleanupReport> {
        match self {
            ExecError::TimedOut { cleanup, .. } | ExecError::Cancelled { cleanup } => Some(cleanup),
            _ => None,
        }
    }

    pub fn reason_code(&self) -> &'static str {
        match self {
            ExecError::InvalidHost { .. } => "invalid_host",
            ExecError::Spawn { .. } => "spawn_failure",
            ExecError::Wait(_) => "wait_failure",
            ExecError::TimedOut { .. } => "timeout",
            ExecError::Cancelled { .. } => "cancelled",
        }
    }
}
