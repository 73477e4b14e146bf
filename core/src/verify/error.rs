use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListErrorKind {
    InvalidMask,
    Unreachable,
    CommandFailed,
    Io,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListError {
    pub kind: ListErrorKind,
    pub message: String,
}

impl ListError {
    pub fn new(kind: ListErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ListError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ListError {}

pub fn invalid_mask(message: impl Into<String>) -> ListError {
    ListError::new(ListErrorKind::InvalidMask, message)
}

pub fn host_unreachable(message: impl Into<String>) -> ListError {
    ListError::new(ListErrorKind::Unreachable, message)
}

pub fn command_failed(message: impl Into<String>) -> ListError {
    ListError::new(ListErrorKind::CommandFailed, message)
}

pub fn io_error(message: impl Into<String>) -> ListError {
    ListError::new(ListErrorKind::Io, message)
}
