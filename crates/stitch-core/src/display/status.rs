//! Status and confirmation messages for operations without a resource to
//! show.

use std::fmt;

/// Severity of an [`OperationStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Success,
    Warning,
    Failure,
}

/// A one-line confirmation such as "Saved columns for design".
pub struct OperationStatus {
    pub message: String,
    pub kind: StatusKind,
}

impl OperationStatus {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: StatusKind::Success,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: StatusKind::Warning,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: StatusKind::Failure,
        }
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.kind {
            StatusKind::Success => "Success:",
            StatusKind::Warning => "Warning:",
            StatusKind::Failure => "Error:",
        };
        writeln!(f, "{prefix} {}", self.message)
    }
}
