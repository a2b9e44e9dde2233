#[cfg(feature = "rt")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Outcome of one workload invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct IterationResult {
    pub duration: Duration,
    pub error: Option<ErrorInfo>,
    pub steps: Vec<Step>,
}

impl IterationResult {
    pub fn success(duration: Duration) -> Self {
        Self {
            duration,
            error: None,
            steps: vec![],
        }
    }

    pub fn with_error(mut self, error: ErrorInfo) -> Self {
        self.error = Some(error);
        self
    }

    pub fn with_steps(mut self, steps: Vec<Step>) -> Self {
        self.steps = steps;
        self
    }

    pub fn is_err(&self) -> bool {
        self.error.is_some()
    }
}

/// A named, timed sub-operation inside one iteration (e.g. "login", "push").
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Step {
    pub command: String,
    pub duration: Duration,
}

impl Step {
    pub fn new(command: &str, duration: Duration) -> Self {
        Self {
            command: command.to_string(),
            duration,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "rt", derive(Serialize, Deserialize))]
pub enum ErrorKind {
    /// The workload returned an error.
    Workload,
    /// The workload panicked.
    Panic,
    /// The iteration task was aborted before the workload finished.
    Aborted,
}

/// Typed error carried by an [`IterationResult`] and a [`crate::Sample`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "rt",
    derive(Serialize, Deserialize),
    serde(rename_all = "PascalCase")
)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn workload(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Workload, message)
    }

    pub fn panic(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Panic, message)
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ErrorKind::Workload => write!(f, "{}", self.message),
            ErrorKind::Panic => write!(f, "workload panicked: {}", self.message),
            ErrorKind::Aborted => write!(f, "workload aborted: {}", self.message),
        }
    }
}

impl std::error::Error for ErrorInfo {}
