use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Authentication-relevant state transitions recorded for audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityEventType {
    Registration,
    LoginSuccess,
    LoginFailure,
    AccountLocked,
    Logout,
    TokenRefreshed,
    TokenRevoked,
    PasswordChanged,
    PasswordResetRequested,
    PasswordResetCompleted,
    SessionTerminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl SecurityEventType {
    /// Pure severity classification. Callers never pick severity directly,
    /// so the audit trail stays consistent across call sites.
    pub fn severity(&self) -> Severity {
        match self {
            SecurityEventType::Registration
            | SecurityEventType::LoginSuccess
            | SecurityEventType::Logout
            | SecurityEventType::TokenRefreshed
            | SecurityEventType::TokenRevoked => Severity::Info,
            SecurityEventType::LoginFailure
            | SecurityEventType::PasswordChanged
            | SecurityEventType::PasswordResetRequested
            | SecurityEventType::PasswordResetCompleted
            | SecurityEventType::SessionTerminated => Severity::Warning,
            SecurityEventType::AccountLocked => Severity::Critical,
        }
    }
}

/// Immutable, append-only audit record. Each entry carries its own retention
/// TTL, independent of the account's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityEvent {
    #[serde(rename = "type")]
    pub event_type: SecurityEventType,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_classification() {
        assert_eq!(SecurityEventType::LoginSuccess.severity(), Severity::Info);
        assert_eq!(SecurityEventType::LoginFailure.severity(), Severity::Warning);
        assert_eq!(SecurityEventType::AccountLocked.severity(), Severity::Critical);
        assert_eq!(SecurityEventType::PasswordChanged.severity(), Severity::Warning);
    }

    #[test]
    fn test_event_type_serialization() {
        let json = serde_json::to_string(&SecurityEventType::PasswordResetRequested).unwrap();
        assert_eq!(json, "\"password_reset_requested\"");
        let sev = serde_json::to_string(&Severity::Critical).unwrap();
        assert_eq!(sev, "\"CRITICAL\"");
    }
}
