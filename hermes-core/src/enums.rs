//! Enum types for Hermes rows

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// ROW ENUMS
// ============================================================================

/// Role attached to a user account. Drives which dashboards a session sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Civilian,
    Responder,
    Admin,
    Superadmin,
}

/// Lifecycle of a citizen-submitted report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Verified,
    FalseAlarm,
    Resolved,
}

/// Severity assigned by a responder during verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityLevel {
    Low,
    Moderate,
    High,
    Critical,
}

/// Estimated spread potential of a verified fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpreadPotential {
    Low,
    Moderate,
    High,
}

/// Dispatch state recorded in a response log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Dispatched,
    Arrived,
    Resolved,
}

impl UserRole {
    /// Admin dashboards (user management, media CRUD).
    pub fn is_staff(self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Superadmin)
    }

    /// Roles allowed to verify a preverified report.
    pub fn can_verify(self) -> bool {
        !matches!(self, UserRole::Civilian)
    }
}

impl ReportStatus {
    /// Whether the report no longer needs responder attention.
    pub fn is_closed(self) -> bool {
        matches!(self, ReportStatus::FalseAlarm | ReportStatus::Resolved)
    }
}

// ============================================================================
// DISPLAY / FROMSTR
// ============================================================================

fn normalize_token(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            UserRole::Civilian => "civilian",
            UserRole::Responder => "responder",
            UserRole::Admin => "admin",
            UserRole::Superadmin => "superadmin",
        };
        write!(f, "{}", value)
    }
}

impl FromStr for UserRole {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "civilian" => Ok(UserRole::Civilian),
            "responder" => Ok(UserRole::Responder),
            "admin" => Ok(UserRole::Admin),
            "superadmin" | "sysad" => Ok(UserRole::Superadmin),
            _ => Err(CoreError::UnknownVariant {
                kind: "UserRole",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Verified => "verified",
            ReportStatus::FalseAlarm => "false_alarm",
            ReportStatus::Resolved => "resolved",
        };
        write!(f, "{}", value)
    }
}

impl FromStr for ReportStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "pending" => Ok(ReportStatus::Pending),
            "verified" => Ok(ReportStatus::Verified),
            "falsealarm" => Ok(ReportStatus::FalseAlarm),
            "resolved" => Ok(ReportStatus::Resolved),
            _ => Err(CoreError::UnknownVariant {
                kind: "ReportStatus",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            SeverityLevel::Low => "low",
            SeverityLevel::Moderate => "moderate",
            SeverityLevel::High => "high",
            SeverityLevel::Critical => "critical",
        };
        write!(f, "{}", value)
    }
}

impl fmt::Display for SpreadPotential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            SpreadPotential::Low => "low",
            SpreadPotential::Moderate => "moderate",
            SpreadPotential::High => "high",
        };
        write!(f, "{}", value)
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            ResponseStatus::Dispatched => "dispatched",
            ResponseStatus::Arrived => "arrived",
            ResponseStatus::Resolved => "resolved",
        };
        write!(f, "{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_role_wire_format() {
        let role: UserRole = serde_json::from_str("\"superadmin\"").unwrap();
        assert_eq!(role, UserRole::Superadmin);
        assert_eq!(serde_json::to_string(&UserRole::Civilian).unwrap(), "\"civilian\"");
    }

    #[test]
    fn test_user_role_gates() {
        assert!(!UserRole::Civilian.can_verify());
        assert!(UserRole::Responder.can_verify());
        assert!(!UserRole::Responder.is_staff());
        assert!(UserRole::Admin.is_staff());
        assert!(UserRole::Superadmin.is_staff());
    }

    #[test]
    fn test_report_status_false_alarm_token() {
        let status: ReportStatus = serde_json::from_str("\"false_alarm\"").unwrap();
        assert_eq!(status, ReportStatus::FalseAlarm);
        assert_eq!(status.to_string(), "false_alarm");
        assert!(status.is_closed());
        assert!(!ReportStatus::Pending.is_closed());
    }

    #[test]
    fn test_from_str_normalizes() {
        assert_eq!("Super-Admin".parse::<UserRole>().unwrap(), UserRole::Superadmin);
        assert_eq!("False Alarm".parse::<ReportStatus>().unwrap(), ReportStatus::FalseAlarm);
        assert!("janitor".parse::<UserRole>().is_err());
    }
}
