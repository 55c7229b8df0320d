use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeErrorKind {
    EmptyReport,
    InvalidReport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeError {
    pub kind: IntakeErrorKind,
    pub message: String,
}

impl IntakeError {
    pub fn new(kind: IntakeErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for IntakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for IntakeError {}

pub fn empty_report(message: impl Into<String>) -> IntakeError {
    IntakeError::new(IntakeErrorKind::EmptyReport, message)
}

pub fn invalid_report(message: impl Into<String>) -> IntakeError {
    IntakeError::new(IntakeErrorKind::InvalidReport, message)
}
