use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasoningErrorKind {
    Unavailable,
    Timeout,
    SchemaMismatch,
    Cancelled,
}

impl ReasoningErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ReasoningErrorKind::Unavailable => "reasoning_unavailable",
            ReasoningErrorKind::Timeout => "reasoning_timeout",
            ReasoningErrorKind::SchemaMismatch => "schema_mismatch",
            ReasoningErrorKind::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasoningError {
    pub kind: ReasoningErrorKind,
    pub message: String,
    pub retryable: bool,
    pub attempts: u32,
}

impl ReasoningError {
    pub fn new(kind: ReasoningErrorKind, message: impl Into<String>) -> Self {
        let retryable = matches!(
            kind,
            ReasoningErrorKind::Unavailable | ReasoningErrorKind::Timeout
        );
        Self {
            kind,
            message: message.into(),
            retryable,
            attempts: 0,
        }
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }
}

impl fmt::Display for ReasoningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

impl std::error::Error for ReasoningError {}

pub fn unavailable(message: impl Into<String>) -> ReasoningError {
    ReasoningError::new(ReasoningErrorKind::Unavailable, message)
}

pub fn timeout(message: impl Into<String>) -> ReasoningError {
    ReasoningError::new(ReasoningErrorKind::Timeout, message)
}

pub fn schema_mismatch(message: impl Into<String>) -> ReasoningError {
    ReasoningError::new(ReasoningErrorKind::SchemaMismatch, message)
}

pub fn cancelled(message: impl Into<String>) -> ReasoningError {
    ReasoningError::new(ReasoningErrorKind::Cancelled, message).with_retryable(false)
}
