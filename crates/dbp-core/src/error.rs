//! Error types for validation and driver calls.

use std::fmt;
use thiserror::Error;

/// Whether a driver failure may succeed on a later attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverErrorKind {
    /// Timeouts, refused connections, lost servers
    Transient,
    /// Rejected by the backend (bad role, auth failure, conflict) or partially applied
    Permanent,
}

impl fmt::Display for DriverErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverErrorKind::Transient => f.write_str("transient"),
            DriverErrorKind::Permanent => f.write_str("permanent"),
        }
    }
}

/// A failed backend call. Messages never carry secrets.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} driver error: {message}")]
pub struct DriverError {
    kind: DriverErrorKind,
    message: String,
    partial: bool,
}

impl DriverError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: DriverErrorKind::Transient,
            message: message.into(),
            partial: false,
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: DriverErrorKind::Permanent,
            message: message.into(),
            partial: false,
        }
    }

    /// The principal exists on the backend but not every grant was applied.
    pub fn partial(message: impl Into<String>) -> Self {
        Self {
            kind: DriverErrorKind::Permanent,
            message: format!("partially applied: {}", message.into()),
            partial: true,
        }
    }

    pub fn kind(&self) -> DriverErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_transient(&self) -> bool {
        self.kind == DriverErrorKind::Transient
    }

    pub fn is_partial(&self) -> bool {
        self.partial
    }
}

/// One problem found while validating a batch of principals.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    #[error("principal #{index} has an empty name")]
    EmptyName { index: usize },

    #[error("principal '{0}' is declared more than once")]
    DuplicateName(String),

    #[error("principal '{0}' has an empty target database")]
    EmptyTargetDatabase(String),

    #[error("principal '{0}' has no role grants")]
    NoRoles(String),

    #[error("principal '{principal}' grant #{index} has an empty database")]
    EmptyRoleDatabase { principal: String, index: usize },

    #[error("principal '{principal}' grant #{index} has an empty role")]
    EmptyRole { principal: String, index: usize },
}

/// The batch is invalid; nothing was sent to the backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid principal configuration: {}", render_issues(.issues))]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

fn render_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    pub fn has(&self, issue: &ValidationIssue) -> bool {
        self.issues.contains(issue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_error_display() {
        let err = DriverError::transient("usersInfo timed out after 10s");
        assert_eq!(err.to_string(), "transient driver error: usersInfo timed out after 10s");
        assert!(err.is_transient());
        assert!(!err.is_partial());
    }

    #[test]
    fn test_partial_is_permanent() {
        let err = DriverError::partial("role created, grant on reports failed");
        assert_eq!(err.kind(), DriverErrorKind::Permanent);
        assert!(err.is_partial());
        assert!(err.message().starts_with("partially applied: "));
    }

    #[test]
    fn test_validation_error_lists_all_issues() {
        let err = ValidationError {
            issues: vec![
                ValidationIssue::DuplicateName("user".to_string()),
                ValidationIssue::NoRoles("svc".to_string()),
            ],
        };
        assert_eq!(
            err.to_string(),
            "invalid principal configuration: principal 'user' is declared more than once; principal 'svc' has no role grants"
        );
    }
}
