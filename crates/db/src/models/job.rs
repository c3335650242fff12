//! `jobs` table row.

use portal_core::error::CoreError;
use portal_core::job::{Job, JobLocation, JobStatus, Urgency};
use portal_core::types::{DbId, Timestamp};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct JobRow {
    pub id: DbId,
    pub customer_id: DbId,
    pub title: String,
    pub description: String,
    pub status: String,
    pub urgency: String,
    pub service_type: String,
    pub postcode: String,
    pub town: Option<String>,
    pub city_slug: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub budget: Option<i64>,
    pub quote_count: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<JobRow> for Job {
    type Error = CoreError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        Ok(Job {
            id: row.id,
            customer_id: row.customer_id,
            title: row.title,
            description: row.description,
            status: JobStatus::from_str(&row.status)?,
            urgency: Urgency::from_str(&row.urgency)?,
            service_type: row.service_type,
            location: JobLocation {
                postcode: row.postcode,
                town: row.town,
                city_slug: row.city_slug,
                coordinates: super::point(row.latitude, row.longitude),
            },
            budget: row.budget,
            quote_count: row.quote_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Utc;

    use super::*;

    fn row() -> JobRow {
        let now = Utc::now();
        JobRow {
            id: 7,
            customer_id: 1,
            title: "Leaking radiator".into(),
            description: "Radiator valve leaking onto the carpet".into(),
            status: "quoted".into(),
            urgency: "urgent".into(),
            service_type: "heating".into(),
            postcode: "LS1 4AP".into(),
            town: Some("Leeds".into()),
            city_slug: None,
            latitude: Some(53.79),
            longitude: None,
            budget: None,
            quote_count: 2,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn converts_text_columns_to_enums() {
        let job = Job::try_from(row()).unwrap();
        assert_eq!(job.status, JobStatus::Quoted);
        assert_eq!(job.urgency, Urgency::Urgent);
        // Half a coordinate pair is no coordinate.
        assert!(job.location.coordinates.is_none());
    }

    #[test]
    fn unknown_status_is_rejected() {
        let mut bad = row();
        bad.status = "archived".into();
        assert_matches!(Job::try_from(bad), Err(CoreError::Validation(_)));
    }
}
