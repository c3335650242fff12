//! `users` table row.

use portal_core::error::CoreError;
use portal_core::tier::{SubscriptionStatus, Tier};
use portal_core::types::{DbId, Timestamp};
use portal_core::user::{User, UserProfile};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: DbId,
    pub role: String,
    pub name: String,
    pub email: String,
    pub subscription_tier: String,
    pub subscription_status: String,
    pub business_name: Option<String>,
    pub specialties: Vec<String>,
    pub location_name: Option<String>,
    pub postcode: Option<String>,
    pub city_slug: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<UserRow> for User {
    type Error = CoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            role: row.role,
            name: row.name,
            email: row.email,
            subscription_tier: Tier::from_str(&row.subscription_tier)?,
            subscription_status: SubscriptionStatus::from_str(&row.subscription_status)?,
            profile: UserProfile {
                business_name: row.business_name,
                specialties: row.specialties,
                location_name: row.location_name,
                postcode: row.postcode,
                city_slug: row.city_slug,
                coordinates: super::point(row.latitude, row.longitude),
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// DTO for inserting a user. Accounts are provisioned by the identity
/// provider; this exists for seeding and tests.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub role: String,
    pub name: String,
    pub email: String,
    pub subscription_tier: Tier,
    pub subscription_status: SubscriptionStatus,
}
