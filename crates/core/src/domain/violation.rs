use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classification of an authorization failure.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationKind {
    UnauthorizedSubscribe,
    UnauthorizedUnsubscribe,
}

impl ViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnauthorizedSubscribe => "UNAUTHORIZED_SUBSCRIBE",
            Self::UnauthorizedUnsubscribe => "UNAUTHORIZED_UNSUBSCRIBE",
        }
    }

    /// The operation name used in error messages and log lines.
    pub fn operation(&self) -> &'static str {
        match self {
            Self::UnauthorizedSubscribe => "subscribe",
            Self::UnauthorizedUnsubscribe => "unsubscribe",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

/// A recorded authorization failure.
///
/// Fatal in strict mode, advisory in lenient mode; either way the record is
/// kept so operators can audit degraded-mode traffic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub caller_id: String,
    pub message: String,
    /// Diagnostic trace of the call site; never used for decisions.
    pub trace: String,
    pub severity: Severity,
    pub recorded_at: DateTime<Utc>,
}

impl Violation {
    pub fn new(kind: ViolationKind, caller_id: impl Into<String>, trace: impl Into<String>) -> Self {
        let caller_id = caller_id.into();
        Self {
            message: format!("{} attempted by unauthorized caller {caller_id}", kind.operation()),
            kind,
            caller_id,
            trace: trace.into(),
            severity: Severity::Error,
            recorded_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_message_names_caller() {
        let v = Violation::new(ViolationKind::UnauthorizedSubscribe, "unauthenticated", "direct transport access");
        assert_eq!(v.kind.as_str(), "UNAUTHORIZED_SUBSCRIBE");
        assert_eq!(v.severity, Severity::Error);
        assert!(v.message.contains("unauthenticated"));
    }
}
