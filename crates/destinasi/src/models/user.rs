//! User accounts and roles.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account role. Stored as its lowercase name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Manages the destinations they are PIC of.
    Admin,
    /// Manages everything, including users and categories.
    Superadmin,
}

impl Role {
    /// All roles, in the order forms list them.
    pub const ALL: [Role; 2] = [Role::Admin, Role::Superadmin];

    /// The stored name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Superadmin => "superadmin",
        }
    }

    /// Whether this role bypasses ownership checks.
    #[must_use]
    pub fn is_superadmin(&self) -> bool {
        matches!(self, Self::Superadmin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "superadmin" => Ok(Self::Superadmin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// A user account. The password hash never leaves storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Row id.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Login email, unique.
    pub email: String,
    /// Account role.
    pub role: Role,
    /// Optional contact number.
    pub phone_number: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

/// The fields of a user shown next to the records they own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    /// Row id.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

/// Validated user payload.
///
/// `password_hash` is `None` on updates that keep the current password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDraft {
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: String,
    /// New password hash, if any.
    pub password_hash: Option<String>,
    /// Account role.
    pub role: Role,
    /// Optional contact number.
    pub phone_number: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip_through_str() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("owner".parse::<Role>().is_err());
        assert!("Admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Superadmin).unwrap(), "\"superadmin\"");
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, Role::Admin);
    }

    #[test]
    fn test_is_superadmin() {
        assert!(Role::Superadmin.is_superadmin());
        assert!(!Role::Admin.is_superadmin());
    }

    #[test]
    fn test_user_serialization_has_no_password() {
        let user = User {
            id: 1,
            name: "Rina".to_string(),
            email: "rina@example.com".to_string(),
            role: Role::Admin,
            phone_number: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password"));
        assert!(json.contains("\"role\":\"admin\""));
    }
}
