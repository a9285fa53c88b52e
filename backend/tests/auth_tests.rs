//! Authentication and authorization tests
//!
//! Property-based and unit tests for:
//! - Role permission enforcement
//! - Organization and user registration validation

use proptest::prelude::*;
use shared::{
    permission, validate_email, validate_organization_code, validate_password, validate_tax_id,
    Action, Resource, UserRole, ALL_PERMISSIONS,
};

/// Same check the request extractor performs against token claims
fn grants(permissions: &[String], resource: Resource, action: Action) -> bool {
    let wanted = permission(resource, action);
    permissions.iter().any(|p| p == ALL_PERMISSIONS || *p == wanted)
}

// ============================================================================
// Property Test Strategies
// ============================================================================

/// Generate valid organization codes (3-10 uppercase alphanumeric)
fn organization_code_strategy() -> impl Strategy<Value = String> {
    "[A-Z0-9]{3,10}"
}

/// Generate valid email addresses
fn email_strategy() -> impl Strategy<Value = String> {
    "[a-z]{5,10}@[a-z]{3,8}\\.(com|org|net|com\\.mx)"
}

/// Generate valid passwords (8+ chars with a digit)
fn password_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z!@#$%]{7,19}[0-9]"
}

fn role_strategy() -> impl Strategy<Value = UserRole> {
    prop_oneof![
        Just(UserRole::Owner),
        Just(UserRole::Manager),
        Just(UserRole::Operator),
        Just(UserRole::Viewer),
    ]
}

fn resource_strategy() -> impl Strategy<Value = Resource> {
    prop::sample::select(Resource::ALL.to_vec())
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![Just(Action::View), Just(Action::Edit), Just(Action::Approve)]
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Role permissions are ordered: anything a lower role may do, a higher role may too
    #[test]
    fn test_role_hierarchy(resource in resource_strategy(), action in action_strategy()) {
        let ladder = [UserRole::Viewer, UserRole::Operator, UserRole::Manager, UserRole::Owner];
        for pair in ladder.windows(2) {
            let lower = grants(&pair[0].permissions(), resource, action);
            let higher = grants(&pair[1].permissions(), resource, action);
            prop_assert!(!lower || higher, "{:?} may {:?} but {:?} may not", pair[0], action, pair[1]);
        }
    }

    /// Every role can view every resource
    #[test]
    fn test_every_role_can_view(role in role_strategy(), resource in resource_strategy()) {
        prop_assert!(grants(&role.permissions(), resource, Action::View));
    }

    /// Permission strings are resource:action with no spaces
    #[test]
    fn test_permission_format_validity(role in role_strategy()) {
        for perm in role.permissions() {
            let parts: Vec<&str> = perm.split(':').collect();
            prop_assert_eq!(parts.len(), 2);
            prop_assert!(!perm.contains(' '));
        }
    }

    /// Roles survive being stored as text
    #[test]
    fn test_role_text_round_trip(role in role_strategy()) {
        prop_assert_eq!(UserRole::from_str(role.as_str()), Some(role));
    }

    #[test]
    fn test_organization_code_validation(code in organization_code_strategy()) {
        prop_assert!(validate_organization_code(&code).is_ok());
    }

    #[test]
    fn test_password_strength(password in password_strategy()) {
        prop_assert!(validate_password(&password).is_ok());
    }

    #[test]
    fn test_email_format(email in email_strategy()) {
        prop_assert!(validate_email(&email).is_ok());
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod role_permission_tests {
    use super::*;

    #[test]
    fn test_owner_has_all_permissions() {
        assert_eq!(UserRole::Owner.permissions(), vec![ALL_PERMISSIONS.to_string()]);
    }

    #[test]
    fn test_manager_approves() {
        let perms = UserRole::Manager.permissions();
        assert!(grants(&perms, Resource::Purchasing, Action::Approve));
        assert!(grants(&perms, Resource::Inventory, Action::Edit));
    }

    #[test]
    fn test_operator_cannot_approve() {
        let perms = UserRole::Operator.permissions();
        assert!(grants(&perms, Resource::Receiving, Action::Edit));
        for resource in Resource::ALL {
            assert!(!grants(&perms, resource, Action::Approve));
        }
    }

    #[test]
    fn test_viewer_is_read_only() {
        let perms = UserRole::Viewer.permissions();
        assert_eq!(perms.len(), Resource::ALL.len());
        assert!(!grants(&perms, Resource::Catalog, Action::Edit));
    }

    #[test]
    fn test_permission_format() {
        assert_eq!(permission(Resource::FoodSafety, Action::Edit), "food_safety:edit");
        assert_eq!(UserRole::from_str("admin"), None);
    }
}

#[cfg(test)]
mod registration_tests {
    use super::*;

    #[test]
    fn test_valid_organization_codes() {
        for code in ["ABC", "PKH01", "EMPAQUE123"] {
            assert!(validate_organization_code(code).is_ok(), "{} should be valid", code);
        }
    }

    #[test]
    fn test_invalid_organization_codes() {
        for code in ["AB", "EMPAQUE1234", "pkh01", "PKH-01", ""] {
            assert!(validate_organization_code(code).is_err(), "{} should be invalid", code);
        }
    }

    #[test]
    fn test_password_rules() {
        assert!(validate_password("short1").is_err());
        assert!(validate_password("nodigitshere").is_err());
        assert!(validate_password("packhouse2024").is_ok());
    }

    #[test]
    fn test_email_rules() {
        assert!(validate_email("ops@packhouse.mx").is_ok());
        assert!(validate_email("ops.packhouse.mx").is_err());
        assert!(validate_email("@packhouse.mx").is_err());
        assert!(validate_email("ops@mx").is_err());
    }

    #[test]
    fn test_tax_id_rules() {
        assert!(validate_tax_id("EMP010101AB1").is_ok());
        assert!(validate_tax_id("A&B010101XY9").is_ok());
        assert!(validate_tax_id("SHORT1").is_err());
        assert!(validate_tax_id("emp010101ab1").is_err());
    }
}
