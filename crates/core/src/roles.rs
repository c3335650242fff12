//! Well-known role name constants.
//!
//! These must match the `users_role_check` constraint in the initial migration.

pub const ROLE_CUSTOMER: &str = "customer";
pub const ROLE_TRADESPERSON: &str = "tradesperson";
pub const ROLE_BUSINESS_OWNER: &str = "business_owner";
pub const ROLE_ADMIN: &str = "admin";

/// Every role a user account may hold.
pub const ALL_ROLES: &[&str] = &[
    ROLE_CUSTOMER,
    ROLE_TRADESPERSON,
    ROLE_BUSINESS_OWNER,
    ROLE_ADMIN,
];

/// Roles that provide services to customers (quote on and search for jobs).
pub const SERVICE_PROVIDER_ROLES: &[&str] = &[ROLE_TRADESPERSON, ROLE_BUSINESS_OWNER];

/// Whether `role` is a service-provider role.
pub fn is_service_provider(role: &str) -> bool {
    SERVICE_PROVIDER_ROLES.contains(&role)
}

/// Whether `role` is one of [`ALL_ROLES`].
pub fn is_known_role(role: &str) -> bool {
    ALL_ROLES.contains(&role)
}
