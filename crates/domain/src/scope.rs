//! Login scopes, platform roles, and account states.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use shikkha_core::{AppError, AppResult};

/// The login role category an OTP challenge is bound to.
///
/// A phone number may hold separate accounts per scope (a parent who also
/// teaches logs in under either scope with the same number), so the scope is
/// part of every challenge key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginScope {
    /// Institution administration logins.
    Admin,
    /// Teaching staff logins.
    Teacher,
    /// Student logins.
    Student,
    /// Parent / guardian logins.
    Parent,
}

impl LoginScope {
    /// Returns the storage string for this scope.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Teacher => "teacher",
            Self::Student => "student",
            Self::Parent => "parent",
        }
    }
}

impl FromStr for LoginScope {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "admin" => Ok(Self::Admin),
            "teacher" => Ok(Self::Teacher),
            "student" => Ok(Self::Student),
            "parent" => Ok(Self::Parent),
            _ => Err(AppError::Validation(format!(
                "unknown login scope '{value}'"
            ))),
        }
    }
}

/// Platform role attached to an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Cross-institution platform operator.
    SuperAdmin,
    /// Institution administrator.
    Admin,
    /// Head of institution.
    Principal,
    /// Non-teaching office staff.
    Staff,
    /// Teaching staff.
    Teacher,
    /// Enrolled student.
    Student,
    /// Parent or guardian of a student.
    Parent,
}

impl UserRole {
    /// Returns the storage string for this role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::Admin => "admin",
            Self::Principal => "principal",
            Self::Staff => "staff",
            Self::Teacher => "teacher",
            Self::Student => "student",
            Self::Parent => "parent",
        }
    }

    /// Whether the role has institution-wide unrestricted record visibility.
    #[must_use]
    pub fn is_privileged(&self) -> bool {
        matches!(
            self,
            Self::SuperAdmin | Self::Admin | Self::Principal | Self::Staff
        )
    }
}

impl FromStr for UserRole {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "super_admin" => Ok(Self::SuperAdmin),
            "admin" => Ok(Self::Admin),
            "principal" => Ok(Self::Principal),
            "staff" => Ok(Self::Staff),
            "teacher" => Ok(Self::Teacher),
            "student" => Ok(Self::Student),
            "parent" => Ok(Self::Parent),
            _ => Err(AppError::Validation(format!("unknown user role '{value}'"))),
        }
    }
}

/// Lifecycle state of an account record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    /// Account may log in.
    Active,
    /// Account awaits institution approval.
    Pending,
    /// Account was deactivated by the institution.
    Inactive,
    /// Account application was rejected.
    Rejected,
}

impl AccountStatus {
    /// Returns the storage string for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Pending => "pending",
            Self::Inactive => "inactive",
            Self::Rejected => "rejected",
        }
    }

    /// Parses a storage string into an account status.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "active" => Ok(Self::Active),
            "pending" => Ok(Self::Pending),
            "inactive" => Ok(Self::Inactive),
            "rejected" => Ok(Self::Rejected),
            _ => Err(AppError::Validation(format!(
                "unknown account status '{value}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{AccountStatus, LoginScope, UserRole};

    #[test]
    fn scope_round_trips_through_storage_string() {
        for scope in [
            LoginScope::Admin,
            LoginScope::Teacher,
            LoginScope::Student,
            LoginScope::Parent,
        ] {
            assert_eq!(LoginScope::from_str(scope.as_str()).ok(), Some(scope));
        }
    }

    #[test]
    fn unknown_scope_is_rejected() {
        assert!(LoginScope::from_str("janitor").is_err());
    }

    #[test]
    fn office_roles_are_privileged() {
        assert!(UserRole::SuperAdmin.is_privileged());
        assert!(UserRole::Admin.is_privileged());
        assert!(UserRole::Principal.is_privileged());
        assert!(UserRole::Staff.is_privileged());
    }

    #[test]
    fn directory_roles_are_not_privileged() {
        assert!(!UserRole::Teacher.is_privileged());
        assert!(!UserRole::Student.is_privileged());
        assert!(!UserRole::Parent.is_privileged());
    }

    #[test]
    fn account_status_round_trips() {
        for status in [
            AccountStatus::Active,
            AccountStatus::Pending,
            AccountStatus::Inactive,
            AccountStatus::Rejected,
        ] {
            assert_eq!(AccountStatus::parse(status.as_str()).ok(), Some(status));
        }
    }
}
