//! Repository for the `quotes` table.

use portal_core::quote::{NewQuote, QuoteStatus};
use portal_core::types::DbId;
use sqlx::PgPool;

use crate::models::quote::QuoteRow;

const COLUMNS: &str = "id, job_id, tradesperson_id, amount, message, status, created_at";

/// Provides CRUD operations for quotes.
pub struct QuoteRepo;

impl QuoteRepo {
    /// Insert a pending quote and increment the job's `quote_count` in one
    /// transaction.
    ///
    /// Fails with a unique violation on `uq_quotes_job_tradesperson` if the
    /// tradesperson has already quoted this job.
    pub async fn create(
        pool: &PgPool,
        job_id: DbId,
        tradesperson_id: DbId,
        input: &NewQuote,
    ) -> Result<QuoteRow, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let insert_query = format!(
            "INSERT INTO quotes (job_id, tradesperson_id, amount, message, status) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        let quote = sqlx::query_as::<_, QuoteRow>(&insert_query)
            .bind(job_id)
            .bind(tradesperson_id)
            .bind(input.amount)
            .bind(&input.message)
            .bind(QuoteStatus::Pending.as_str())
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query("UPDATE jobs SET quote_count = quote_count + 1 WHERE id = $1")
            .bind(job_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(quote)
    }

    /// Number of quotes a tradesperson has awaiting a decision.
    pub async fn count_pending_for(
        pool: &PgPool,
        tradesperson_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM quotes WHERE tradesperson_id = $1 AND status = $2",
        )
        .bind(tradesperson_id)
        .bind(QuoteStatus::Pending.as_str())
        .fetch_one(pool)
        .await?;
        Ok(count)
    }

    /// Whether the tradesperson has already quoted the job.
    pub async fn exists(
        pool: &PgPool,
        job_id: DbId,
        tradesperson_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM quotes WHERE job_id = $1 AND tradesperson_id = $2)",
        )
        .bind(job_id)
        .bind(tradesperson_id)
        .fetch_one(pool)
        .await?;
        Ok(exists)
    }
}
