//! Repository for the `users` table.

use portal_core::types::DbId;
use portal_core::user::{UpdateProfile, UserProfile};
use sqlx::PgPool;

use crate::models::point;
use crate::models::user::{CreateUser, UserRow};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, role, name, email, subscription_tier, subscription_status, \
                       business_name, specialties, location_name, postcode, city_slug, \
                       latitude, longitude, created_at, updated_at";

/// Provides CRUD operations for users.
pub struct UserRepo;

impl UserRepo {
    /// Insert a new user, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<UserRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (role, name, email, subscription_tier, subscription_status)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserRow>(&query)
            .bind(&input.role)
            .bind(&input.name)
            .bind(&input.email)
            .bind(input.subscription_tier.as_str())
            .bind(input.subscription_status.as_str())
            .fetch_one(pool)
            .await
    }

    /// Find a user by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<UserRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, UserRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Apply a profile patch under a row lock.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update_profile(
        pool: &PgPool,
        id: DbId,
        patch: &UpdateProfile,
    ) -> Result<Option<UserRow>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let select = format!("SELECT {COLUMNS} FROM users WHERE id = $1 FOR UPDATE");
        let Some(row) = sqlx::query_as::<_, UserRow>(&select)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        let mut profile = UserProfile {
            business_name: row.business_name,
            specialties: row.specialties,
            location_name: row.location_name,
            postcode: row.postcode,
            city_slug: row.city_slug,
            coordinates: point(row.latitude, row.longitude),
        };
        patch.apply_to(&mut profile);

        let update = format!(
            "UPDATE users SET
                business_name = $2,
                specialties = $3,
                location_name = $4,
                postcode = $5,
                city_slug = $6,
                latitude = $7,
                longitude = $8
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, UserRow>(&update)
            .bind(id)
            .bind(&profile.business_name)
            .bind(&profile.specialties)
            .bind(&profile.location_name)
            .bind(&profile.postcode)
            .bind(&profile.city_slug)
            .bind(profile.coordinates.map(|p| p.lat))
            .bind(profile.coordinates.map(|p| p.lng))
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(updated))
    }
}
