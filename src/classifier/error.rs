use std::fmt;

use crate::reasoning::{ReasoningError, ReasoningErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierErrorKind {
    ClassificationFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierError {
    pub kind: ClassifierErrorKind,
    pub cause: ReasoningErrorKind,
    pub message: String,
    pub attempts: u32,
}

impl ClassifierError {
    pub fn from_reasoning(err: ReasoningError) -> Self {
        Self {
            kind: ClassifierErrorKind::ClassificationFailed,
            cause: err.kind,
            message: format!("classification failed: {}", err.message),
            attempts: err.attempts,
        }
    }
}

impl fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ClassifierError {}
