//! Well-known role name constants.
//!
//! These must match the `ck_users_role` check constraint in
//! `20260301000002_create_users.sql` and the `role` value written to the
//! identity provider's public metadata.

pub const ROLE_EMPLOYEE: &str = "employee";
pub const ROLE_THERAPIST: &str = "therapist";
pub const ROLE_EMPLOYER_ADMIN: &str = "employer_admin";

/// All roles a user may hold.
pub const ALL_ROLES: [&str; 3] = [ROLE_EMPLOYEE, ROLE_THERAPIST, ROLE_EMPLOYER_ADMIN];

/// Roles a user may pick for themselves during onboarding.
/// `employer_admin` is granted only through the identity provider.
pub const SELF_ASSIGNABLE_ROLES: [&str; 2] = [ROLE_EMPLOYEE, ROLE_THERAPIST];

/// Role assigned when the identity provider carries no role metadata.
pub const DEFAULT_ROLE: &str = ROLE_EMPLOYEE;

/// Whether `role` is one of the known role names.
pub fn is_known_role(role: &str) -> bool {
    ALL_ROLES.contains(&role)
}

/// Whether a user may select `role` for themselves.
pub fn is_self_assignable_role(role: &str) -> bool {
    SELF_ASSIGNABLE_ROLES.contains(&role)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_roles_are_accepted() {
        assert!(is_known_role("employee"));
        assert!(is_known_role("therapist"));
        assert!(is_known_role("employer_admin"));
    }

    #[test]
    fn unknown_roles_are_rejected() {
        assert!(!is_known_role("admin"));
        assert!(!is_known_role(""));
        assert!(!is_known_role("Therapist"));
    }

    #[test]
    fn employer_admin_is_not_self_assignable() {
        assert!(is_self_assignable_role("employee"));
        assert!(is_self_assignable_role("therapist"));
        assert!(!is_self_assignable_role("employer_admin"));
        assert!(!is_self_assignable_role("admin"));
    }
}
