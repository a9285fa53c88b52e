//! Organizations (tenants), users and role permissions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A customer account; every other record is scoped to one
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    /// Short uppercase code (e.g., "PKH01")
    pub code: String,
    pub tax_id: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user account inside an organization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Resources guarded by permissions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Catalog,
    Harvest,
    Receiving,
    Batch,
    FoodSafety,
    Packing,
    Purchasing,
    Inventory,
}

impl Resource {
    pub const ALL: [Resource; 8] = [
        Resource::Catalog,
        Resource::Harvest,
        Resource::Receiving,
        Resource::Batch,
        Resource::FoodSafety,
        Resource::Packing,
        Resource::Purchasing,
        Resource::Inventory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Catalog => "catalog",
            Resource::Harvest => "harvest",
            Resource::Receiving => "receiving",
            Resource::Batch => "batch",
            Resource::FoodSafety => "food_safety",
            Resource::Packing => "packing",
            Resource::Purchasing => "purchasing",
            Resource::Inventory => "inventory",
        }
    }
}

/// Actions that can be performed on resources
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    View,
    Edit,
    Approve,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Edit => "edit",
            Action::Approve => "approve",
        }
    }
}

/// Permission string in `resource:action` form
pub fn permission(resource: Resource, action: Action) -> String {
    format!("{}:{}", resource.as_str(), action.as_str())
}

/// Wildcard permission granted to organization owners
pub const ALL_PERMISSIONS: &str = "*:*";

/// Role of a user within its organization
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Owner,
    Manager,
    Operator,
    Viewer,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Owner => "owner",
            UserRole::Manager => "manager",
            UserRole::Operator => "operator",
            UserRole::Viewer => "viewer",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "owner" => Some(UserRole::Owner),
            "manager" => Some(UserRole::Manager),
            "operator" => Some(UserRole::Operator),
            "viewer" => Some(UserRole::Viewer),
            _ => None,
        }
    }

    /// Permissions carried in the access token
    pub fn permissions(&self) -> Vec<String> {
        match self {
            UserRole::Owner => vec![ALL_PERMISSIONS.to_string()],
            UserRole::Manager => Resource::ALL
                .iter()
                .flat_map(|r| {
                    [Action::View, Action::Edit, Action::Approve]
                        .into_iter()
                        .map(move |a| permission(*r, a))
                })
                .collect(),
            UserRole::Operator => Resource::ALL
                .iter()
                .flat_map(|r| {
                    [Action::View, Action::Edit]
                        .into_iter()
                        .map(move |a| permission(*r, a))
                })
                .collect(),
            UserRole::Viewer => Resource::ALL
                .iter()
                .map(|r| permission(*r, Action::View))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_has_wildcard() {
        assert_eq!(UserRole::Owner.permissions(), vec!["*:*".to_string()]);
    }

    #[test]
    fn test_operator_cannot_approve() {
        let perms = UserRole::Operator.permissions();
        assert!(perms.contains(&"inventory:edit".to_string()));
        assert!(!perms.contains(&"purchasing:approve".to_string()));
    }

    #[test]
    fn test_viewer_is_read_only() {
        let perms = UserRole::Viewer.permissions();
        assert_eq!(perms.len(), Resource::ALL.len());
        assert!(perms.iter().all(|p| p.ends_with(":view")));
    }

    #[test]
    fn test_role_round_trip() {
        for role in [UserRole::Owner, UserRole::Manager, UserRole::Operator, UserRole::Viewer] {
            assert_eq!(UserRole::from_str(role.as_str()), Some(role));
        }
        assert_eq!(UserRole::from_str("admin"), None);
    }
}
