//! Search-index document shapes.
//!
//! Records are flat, index-friendly projections of [`Job`] and [`User`]:
//! timestamps become epoch milliseconds, coordinates become a `_geoloc`
//! object, and list fields are normalised so facet values are stable.

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::geo::GeoPoint;
use crate::job::{Job, JobLocation, JobStatus, Urgency};
use crate::types::{DbId, Timestamp};
use crate::user::{normalize_specialties, User};

fn millis_to_timestamp(millis: i64) -> Result<Timestamp, CoreError> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| CoreError::Internal(format!("Timestamp out of range: {millis}")))
}

/// A job as stored in the jobs index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    #[serde(rename = "objectID")]
    pub object_id: String,
    pub customer_id: DbId,
    pub title: String,
    pub description: String,
    pub status: JobStatus,
    pub urgency: Urgency,
    /// Numeric copy of the urgency ordering for the urgency-sorted replica.
    pub urgency_rank: u8,
    pub service_type: String,
    /// Facet values a provider's specialties are matched against.
    pub specialties: Vec<String>,
    pub postcode: String,
    pub town: Option<String>,
    pub city_slug: Option<String>,
    #[serde(rename = "_geoloc", default, skip_serializing_if = "Option::is_none")]
    pub geoloc: Option<GeoPoint>,
    pub budget: Option<i64>,
    pub quote_count: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

impl JobRecord {
    /// Project a job into its index record. `coordinates` and `city_slug`
    /// are the resolved values (which may come from geocoding rather than
    /// the stored job).
    pub fn from_job(job: &Job, coordinates: Option<GeoPoint>, city_slug: Option<String>) -> Self {
        Self {
            object_id: job.id.to_string(),
            customer_id: job.customer_id,
            title: job.title.clone(),
            description: job.description.clone(),
            status: job.status,
            urgency: job.urgency,
            urgency_rank: job.urgency.rank(),
            service_type: job.service_type.clone(),
            specialties: normalize_specialties(std::slice::from_ref(&job.service_type)),
            postcode: job.location.postcode.clone(),
            town: job.location.town.clone(),
            city_slug,
            geoloc: coordinates.filter(GeoPoint::is_valid),
            budget: job.budget,
            quote_count: job.quote_count,
            created_at: job.created_at.timestamp_millis(),
            updated_at: job.updated_at.timestamp_millis(),
        }
    }

    /// Rebuild a job from a search hit.
    pub fn into_job(self) -> Result<Job, CoreError> {
        let id = self
            .object_id
            .parse::<DbId>()
            .map_err(|_| CoreError::Internal(format!("Bad objectID '{}'", self.object_id)))?;

        Ok(Job {
            id,
            customer_id: self.customer_id,
            title: self.title,
            description: self.description,
            status: self.status,
            urgency: self.urgency,
            service_type: self.service_type,
            location: JobLocation {
                postcode: self.postcode,
                town: self.town,
                city_slug: self.city_slug,
                coordinates: self.geoloc,
            },
            budget: self.budget,
            quote_count: self.quote_count,
            created_at: millis_to_timestamp(self.created_at)?,
            updated_at: millis_to_timestamp(self.updated_at)?,
        })
    }
}

/// A service provider as stored in the tradespeople index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradespersonRecord {
    #[serde(rename = "objectID")]
    pub object_id: String,
    pub name: String,
    pub business_name: Option<String>,
    pub role: String,
    pub tier: String,
    pub specialties: Vec<String>,
    pub location_name: Option<String>,
    pub postcode: Option<String>,
    pub city_slug: Option<String>,
    #[serde(rename = "_geoloc", default, skip_serializing_if = "Option::is_none")]
    pub geoloc: Option<GeoPoint>,
    pub updated_at: i64,
}

impl TradespersonRecord {
    pub fn from_user(user: &User, coordinates: Option<GeoPoint>, city_slug: Option<String>) -> Self {
        Self {
            object_id: user.id.to_string(),
            name: user.name.clone(),
            business_name: user.profile.business_name.clone(),
            role: user.role.clone(),
            tier: user.effective_tier().as_str().to_string(),
            specialties: normalize_specialties(&user.profile.specialties),
            location_name: user.profile.location_name.clone(),
            postcode: user.profile.postcode.clone(),
            city_slug,
            geoloc: coordinates.filter(GeoPoint::is_valid),
            updated_at: user.updated_at.timestamp_millis(),
        }
    }
}
