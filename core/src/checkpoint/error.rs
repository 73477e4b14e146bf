use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerErrorKind {
    Read,
    Write,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerError {
    pub kind: LedgerErrorKind,
    pub message: String,
}

impl LedgerError {
    pub fn new(kind: LedgerErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for LedgerError {}

pub fn read_error(message: impl Into<String>) -> LedgerError {
    LedgerError::new(LedgerErrorKind::Read, message)
}

pub fn write_error(message: impl Into<String>) -> LedgerError {
    LedgerError::new(LedgerErrorKind::Write, message)
}

pub fn internal_error(message: impl Into<String>) -> LedgerError {
    LedgerError::new(LedgerErrorKind::Internal, message)
}
