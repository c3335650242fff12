//! `quotes` table row.

use portal_core::error::CoreError;
use portal_core::quote::{Quote, QuoteStatus};
use portal_core::types::{DbId, Timestamp};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct QuoteRow {
    pub id: DbId,
    pub job_id: DbId,
    pub tradesperson_id: DbId,
    pub amount: i64,
    pub message: Option<String>,
    pub status: String,
    pub created_at: Timestamp,
}

impl TryFrom<QuoteRow> for Quote {
    type Error = CoreError;

    fn try_from(row: QuoteRow) -> Result<Self, Self::Error> {
        Ok(Quote {
            id: row.id,
            job_id: row.job_id,
            tradesperson_id: row.tradesperson_id,
            amount: row.amount,
            message: row.message,
            status: QuoteStatus::from_str(&row.status)?,
            created_at: row.created_at,
        })
    }
}
