use std::fmt;

use crate::reasoning::{ReasoningError, ReasoningErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosisErrorKind {
    ReasoningFailed,
    HistoryUnavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosisError {
    pub kind: DiagnosisErrorKind,
    pub cause: Option<ReasoningErrorKind>,
    pub message: String,
    pub attempts: u32,
}

impl DiagnosisError {
    pub fn new(kind: DiagnosisErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            cause: None,
            message: message.into(),
            attempts: 0,
        }
    }

    pub fn from_reasoning(err: ReasoningError) -> Self {
        Self {
            kind: DiagnosisErrorKind::ReasoningFailed,
            cause: Some(err.kind),
            message: format!("diagnosis failed: {}", err.message),
            attempts: err.attempts,
        }
    }

    pub fn cause_label(&self) -> &'static str {
        match (self.kind, self.cause) {
            (_, Some(cause)) => cause.as_str(),
            (DiagnosisErrorKind::HistoryUnavailable, None) => "history_unavailable",
            (DiagnosisErrorKind::ReasoningFailed, None) => "reasoning_failed",
        }
    }
}

impl fmt::Display for DiagnosisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for DiagnosisError {}

pub fn history_unavailable(message: impl Into<String>) -> DiagnosisError {
    DiagnosisError::new(DiagnosisErrorKind::HistoryUnavailable, message)
}
