//! [`PgStore`]: the store ports implemented over the repositories.

use async_trait::async_trait;
use portal_core::error::CoreError;
use portal_core::job::{DerivedLocation, Job, JobStatus, NewJob};
use portal_core::ports::{JobStore, QuoteStore, Store, UserStore};
use portal_core::quote::{NewQuote, Quote};
use portal_core::types::DbId;
use portal_core::user::{UpdateProfile, User};

use crate::repositories::{JobRepo, QuoteRepo, UserRepo};
use crate::DbPool;

/// Map a sqlx error onto the domain error.
///
/// - `RowNotFound` maps to `NotFound`.
/// - Unique constraint violations (constraint name starting with `uq_`) map to `Conflict`.
/// - Everything else is logged and mapped to `Internal`.
pub fn classify_sqlx_error(err: sqlx::Error) -> CoreError {
    match &err {
        sqlx::Error::RowNotFound => CoreError::NotFound {
            entity: "Row",
            id: 0,
        },
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
            let constraint = db_err.constraint().unwrap_or("unknown");
            if constraint.starts_with("uq_") {
                CoreError::Conflict(format!(
                    "Duplicate value violates unique constraint: {constraint}"
                ))
            } else {
                tracing::error!(error = %db_err, "Database error");
                CoreError::Internal(db_err.to_string())
            }
        }
        other => {
            tracing::error!(error = %other, "Database error");
            CoreError::Internal(other.to_string())
        }
    }
}

/// PostgreSQL-backed primary store.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl JobStore for PgStore {
    async fn find_job(&self, id: DbId) -> Result<Option<Job>, CoreError> {
        JobRepo::find_by_id(&self.pool, id)
            .await
            .map_err(classify_sqlx_error)?
            .map(Job::try_from)
            .transpose()
    }

    async fn list_open_jobs(&self) -> Result<Vec<Job>, CoreError> {
        JobRepo::list_by_status(&self.pool, JobStatus::Open)
            .await
            .map_err(classify_sqlx_error)?
            .into_iter()
            .map(Job::try_from)
            .collect()
    }

    async fn count_open_jobs(&self) -> Result<u64, CoreError> {
        let count = JobRepo::count_by_status(&self.pool, JobStatus::Open)
            .await
            .map_err(classify_sqlx_error)?;
        Ok(count.max(0) as u64)
    }

    async fn create_job(
        &self,
        customer_id: DbId,
        input: &NewJob,
        derived: &DerivedLocation,
    ) -> Result<Job, CoreError> {
        let row = JobRepo::create(&self.pool, customer_id, input, derived)
            .await
            .map_err(classify_sqlx_error)?;
        Job::try_from(row)
    }

    async fn update_job_status(
        &self,
        id: DbId,
        status: JobStatus,
    ) -> Result<Option<Job>, CoreError> {
        JobRepo::update_status(&self.pool, id, status)
            .await
            .map_err(classify_sqlx_error)?
            .map(Job::try_from)
            .transpose()
    }

    async fn delete_job(&self, id: DbId) -> Result<bool, CoreError> {
        JobRepo::delete(&self.pool, id)
            .await
            .map_err(classify_sqlx_error)
    }
}

#[async_trait]
impl QuoteStore for PgStore {
    async fn create_quote(
        &self,
        job_id: DbId,
        tradesperson_id: DbId,
        input: &NewQuote,
    ) -> Result<Quote, CoreError> {
        let row = QuoteRepo::create(&self.pool, job_id, tradesperson_id, input)
            .await
            .map_err(classify_sqlx_error)?;
        Quote::try_from(row)
    }

    async fn count_pending_quotes(&self, tradesperson_id: DbId) -> Result<i64, CoreError> {
        QuoteRepo::count_pending_for(&self.pool, tradesperson_id)
            .await
            .map_err(classify_sqlx_error)
    }

    async fn has_quoted(&self, job_id: DbId, tradesperson_id: DbId) -> Result<bool, CoreError> {
        QuoteRepo::exists(&self.pool, job_id, tradesperson_id)
            .await
            .map_err(classify_sqlx_error)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user(&self, id: DbId) -> Result<Option<User>, CoreError> {
        UserRepo::find_by_id(&self.pool, id)
            .await
            .map_err(classify_sqlx_error)?
            .map(User::try_from)
            .transpose()
    }

    async fn update_profile(
        &self,
        id: DbId,
        patch: &UpdateProfile,
    ) -> Result<Option<User>, CoreError> {
        UserRepo::update_profile(&self.pool, id, patch)
            .await
            .map_err(classify_sqlx_error)?
            .map(User::try_from)
            .transpose()
    }
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> Result<(), CoreError> {
        crate::health_check(&self.pool)
            .await
            .map_err(classify_sqlx_error)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found() {
        assert_matches!(
            classify_sqlx_error(sqlx::Error::RowNotFound),
            CoreError::NotFound { .. }
        );
    }

    #[test]
    fn other_errors_map_to_internal() {
        assert_matches!(
            classify_sqlx_error(sqlx::Error::PoolTimedOut),
            CoreError::Internal(_)
        );
    }
}
