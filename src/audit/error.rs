use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditErrorKind {
    WriteFailed,
    ReadFailed,
    Corrupted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditError {
    pub kind: AuditErrorKind,
    pub message: String,
}

impl AuditError {
    pub fn new(kind: AuditErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for AuditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AuditError {}

pub fn write_failed(message: impl Into<String>) -> AuditError {
    AuditError::new(AuditErrorKind::WriteFailed, message)
}

pub fn read_failed(message: impl Into<String>) -> AuditError {
    AuditError::new(AuditErrorKind::ReadFailed, message)
}

pub fn corrupted(message: impl Into<String>) -> AuditError {
    AuditError::new(AuditErrorKind::Corrupted, message)
}
