//! Repository for the `jobs` table.

use portal_core::job::{DerivedLocation, JobStatus, NewJob};
use portal_core::types::DbId;
use sqlx::PgPool;

use crate::models::job::JobRow;

/// Column list shared across queries to avoid repetition.
pub(crate) const COLUMNS: &str = "id, customer_id, title, description, status, urgency, \
                                  service_type, postcode, town, city_slug, latitude, longitude, \
                                  budget, quote_count, created_at, updated_at";

/// Provides CRUD operations for jobs.
pub struct JobRepo;

impl JobRepo {
    /// Insert a new `open` job, returning the created row.
    ///
    /// `input` is expected to be normalised already.
    pub async fn create(
        pool: &PgPool,
        customer_id: DbId,
        input: &NewJob,
        derived: &DerivedLocation,
    ) -> Result<JobRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO jobs \
                (customer_id, title, description, status, urgency, service_type, \
                 postcode, town, budget, city_slug, latitude, longitude) \
             VALUES ($1, $2, $3, 'open', $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, JobRow>(&query)
            .bind(customer_id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.urgency.as_str())
            .bind(&input.service_type)
            .bind(&input.postcode)
            .bind(&input.town)
            .bind(input.budget)
            .bind(&derived.city_slug)
            .bind(derived.coordinates.map(|p| p.lat))
            .bind(derived.coordinates.map(|p| p.lng))
            .fetch_one(pool)
            .await
    }

    /// Find a job by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<JobRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, JobRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List every job in the given status, newest first.
    pub async fn list_by_status(
        pool: &PgPool,
        status: JobStatus,
    ) -> Result<Vec<JobRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM jobs WHERE status = $1 ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, JobRow>(&query)
            .bind(status.as_str())
            .fetch_all(pool)
            .await
    }

    /// Count jobs in the given status.
    pub async fn count_by_status(pool: &PgPool, status: JobStatus) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM jobs WHERE status = $1")
            .bind(status.as_str())
            .fetch_one(pool)
            .await?;
        Ok(count)
    }

    /// Set a job's status. Returns `None` if no row with the given `id` exists.
    pub async fn update_status(
        pool: &PgPool,
        id: DbId,
        status: JobStatus,
    ) -> Result<Option<JobRow>, sqlx::Error> {
        let query = format!("UPDATE jobs SET status = $2 WHERE id = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, JobRow>(&query)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Hard-delete a job and (by cascade) its quotes.
    ///
    /// Returns `true` if a row was deleted.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
