use serde::Deserialize;
use serde::Serialize;
use strum_macros::Display;
use strum_macros::EnumString;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum UserRole {
    Admin,
    ClusterHead,
    AccountDirector,
    ProjectManager,
}

impl UserRole {
    /// Human-readable role label.
    pub fn label(&self) -> &'static str {
        match self {
            UserRole::Admin => "Administrator",
            UserRole::ClusterHead => "Cluster Head",
            UserRole::AccountDirector => "Account Director",
            UserRole::ProjectManager => "Project Manager",
        }
    }
}

/// Authenticated caller as returned by `GET /auth/me`. The optional lists
/// restrict which slices of the hierarchy the user may see; absence means
/// unrestricted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clusters: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accounts: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projects: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn role_round_trips_snake_case() {
        let json = serde_json::to_string(&UserRole::AccountDirector).expect("serialize");
        assert_eq!(json, "\"account_director\"");
        let parsed: UserRole = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, UserRole::AccountDirector);
    }

    #[test]
    fn labels_match_display_copy() {
        assert_eq!(UserRole::ClusterHead.label(), "Cluster Head");
    }
}
