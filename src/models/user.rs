use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Student,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Student => "student",
        }
    }
}

/// An account as returned by the backend. Students carry their group
/// binding; `group_code` is denormalized for display and for the
/// cache group filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub role: UserRole,
    #[serde(default)]
    pub group_id: Option<i64>,
    #[serde(default)]
    pub group_code: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserDraft {
    pub username: String,
    /// Absent means the account is created without a password and the
    /// user sets one through the verification-code flow.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UserChange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_wire_names() {
        assert_eq!(serde_json::to_string(&UserRole::Admin).unwrap(), "\"admin\"");
        let role: UserRole = serde_json::from_str("\"student\"").unwrap();
        assert_eq!(role, UserRole::Student);
    }

    #[test]
    fn test_user_without_group() {
        let json = r#"{"id": 1, "username": "admin@uni.md", "role": "admin"}"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert!(user.group_id.is_none());
        assert!(user.group_code.is_none());
    }
}
