use std::fmt;

use crate::reasoning::{ReasoningError, ReasoningErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanningErrorKind {
    ReasoningFailed,
    NoHypothesis,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanningError {
    pub kind: PlanningErrorKind,
    pub cause: Option<ReasoningErrorKind>,
    pub message: String,
    pub attempts: u32,
}

impl PlanningError {
    pub fn new(kind: PlanningErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            cause: None,
            message: message.into(),
            attempts: 0,
        }
    }

    pub fn from_reasoning(err: ReasoningError) -> Self {
        Self {
            kind: PlanningErrorKind::ReasoningFailed,
            cause: Some(err.kind),
            message: format!("planning failed: {}", err.message),
            attempts: err.attempts,
        }
    }

    pub fn cause_label(&self) -> &'static str {
        match (self.kind, self.cause) {
            (_, Some(cause)) => cause.as_str(),
            (PlanningErrorKind::NoHypothesis, None) => "no_hypothesis",
            (PlanningErrorKind::ReasoningFailed, None) => "reasoning_failed",
        }
    }
}

impl fmt::Display for PlanningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for PlanningError {}
