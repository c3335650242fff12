//! Role-based access control (RBAC) extractors.
//!
//! Each extractor wraps [`AuthUser`] and rejects requests whose role does not
//! meet the requirement with 403 Forbidden.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use portal_core::error::CoreError;
use portal_core::roles::{self, ROLE_ADMIN, ROLE_CUSTOMER};

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Requires `tradesperson`, `business_owner` or `admin`.
///
/// Guards the job search: customers never browse other customers' jobs.
///
/// ```ignore
/// async fn search(RequireProviderOrAdmin(user): RequireProviderOrAdmin) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireProviderOrAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireProviderOrAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !roles::is_service_provider(&user.role) && user.role != ROLE_ADMIN {
            return Err(AppError::Core(CoreError::Forbidden(
                "Tradesperson or Business Owner role required".into(),
            )));
        }
        Ok(RequireProviderOrAdmin(user))
    }
}

/// Requires `tradesperson` or `business_owner`. Admins are rejected since
/// they have no subscription tier to quote under.
pub struct RequireServiceProvider(pub AuthUser);

impl FromRequestParts<AppState> for RequireServiceProvider {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !roles::is_service_provider(&user.role) {
            return Err(AppError::Core(CoreError::Forbidden(
                "Only tradespeople and business owners can do this".into(),
            )));
        }
        Ok(RequireServiceProvider(user))
    }
}

/// Requires `customer` or `admin` role.
pub struct RequireCustomer(pub AuthUser);

impl FromRequestParts<AppState> for RequireCustomer {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != ROLE_CUSTOMER && user.role != ROLE_ADMIN {
            return Err(AppError::Core(CoreError::Forbidden(
                "Customer or Admin role required".into(),
            )));
        }
        Ok(RequireCustomer(user))
    }
}

/// Requires any authenticated user (any valid role).
///
/// Functionally equivalent to [`AuthUser`] but named explicitly for use in
/// route definitions where the intent should be self-documenting.
pub struct RequireAuth(pub AuthUser);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        Ok(RequireAuth(user))
    }
}
