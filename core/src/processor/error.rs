use std::fmt;

use crate::checkpoint::LedgerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorErrorKind {
    InvalidConfig,
    Ledger,
    EventLog,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorError {
    pub kind: ProcessorErrorKind,
    pub message: String,
}

impl ProcessorError {
    pub fn new(kind: ProcessorErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ProcessorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ProcessorError {}

impl From<LedgerError> for ProcessorError {
    fn from(err: LedgerError) -> Self {
        ledger_error(format!("checkpoint ledger failure: {err}"))
    }
}

pub fn invalid_config(message: impl Into<String>) -> ProcessorError {
    ProcessorError::new(ProcessorErrorKind::InvalidConfig, message)
}

pub fn ledger_error(message: impl Into<String>) -> ProcessorError {
    ProcessorError::new(ProcessorErrorKind::Ledger, message)
}

pub fn event_log_error(message: impl Into<String>) -> ProcessorError {
    ProcessorError::new(ProcessorErrorKind::EventLog, message)
}
