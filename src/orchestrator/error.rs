use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorErrorKind {
    InvalidTransition,
    NotificationFailed,
    EngineClosed,
    TaskFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorError {
    pub kind: OrchestratorErrorKind,
    pub message: String,
}

impl OrchestratorError {
    pub fn new(kind: OrchestratorErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for OrchestratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for OrchestratorError {}

pub fn invalid_transition(message: impl Into<String>) -> OrchestratorError {
    OrchestratorError::new(OrchestratorErrorKind::InvalidTransition, message)
}

pub fn notification_failed(message: impl Into<String>) -> OrchestratorError {
    OrchestratorError::new(OrchestratorErrorKind::NotificationFailed, message)
}

pub fn engine_closed(message: impl Into<String>) -> OrchestratorError {
    OrchestratorError::new(OrchestratorErrorKind::EngineClosed, message)
}

pub fn task_failed(message: impl Into<String>) -> OrchestratorError {
    OrchestratorError::new(OrchestratorErrorKind::TaskFailed, message)
}
