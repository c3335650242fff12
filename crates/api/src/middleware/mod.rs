//! Authentication and authorization middleware extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the authenticated user from a JWT Bearer token.
//! - [`rbac::RequireProviderOrAdmin`] -- Tradespeople, business owners and admins.
//! - [`rbac::RequireServiceProvider`] -- Tradespeople and business owners only.
//! - [`rbac::RequireCustomer`] -- Requires `customer` or `admin` role.
//! - [`rbac::RequireAuth`] -- Requires any authenticated user.

pub mod auth;
pub mod rbac;
