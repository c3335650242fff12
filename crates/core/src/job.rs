//! Job entity, lifecycle rules, and the wire view returned by the API.

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::CoreError;
use crate::geo::{self, GeoPoint};
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// JobStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Open,
    Quoted,
    Assigned,
    Completed,
    Cancelled,
}

impl JobStatus {
    /// Return the wire-format string for this variant.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Quoted => "quoted",
            Self::Assigned => "assigned",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse from a wire-format string.
    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "open" => Ok(Self::Open),
            "quoted" => Ok(Self::Quoted),
            "assigned" => Ok(Self::Assigned),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(CoreError::Validation(format!("Unknown job status '{other}'"))),
        }
    }

    /// Completed and cancelled jobs never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether a job in this state may move to `next`.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Open, Quoted | Assigned | Cancelled)
                | (Quoted, Open | Assigned | Cancelled)
                | (Assigned, Completed | Cancelled)
        )
    }

    /// Validate a transition, returning the new status.
    pub fn transition(&self, next: JobStatus) -> Result<JobStatus, CoreError> {
        if self.is_terminal() {
            Err(CoreError::Validation(format!(
                "Job is already {} and can no longer change",
                self.as_str()
            )))
        } else if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CoreError::Validation(format!(
                "Cannot move a job from '{}' to '{}'",
                self.as_str(),
                next.as_str()
            )))
        }
    }
}

// ---------------------------------------------------------------------------
// Urgency
// ---------------------------------------------------------------------------

/// How soon the customer needs the work done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Emergency,
    Urgent,
    Soon,
    Flexible,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Emergency => "emergency",
            Self::Urgent => "urgent",
            Self::Soon => "soon",
            Self::Flexible => "flexible",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "emergency" => Ok(Self::Emergency),
            "urgent" => Ok(Self::Urgent),
            "soon" => Ok(Self::Soon),
            "flexible" => Ok(Self::Flexible),
            other => Err(CoreError::Validation(format!("Unknown urgency '{other}'"))),
        }
    }

    /// Sort rank for urgency ordering; lower is more urgent.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Emergency => 0,
            Self::Urgent => 1,
            Self::Soon => 2,
            Self::Flexible => 3,
        }
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// Where the work is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobLocation {
    pub postcode: String,
    pub town: Option<String>,
    pub city_slug: Option<String>,
    pub coordinates: Option<GeoPoint>,
}

/// Location fields worked out from a new job's postcode before it is stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedLocation {
    pub coordinates: Option<GeoPoint>,
    pub city_slug: Option<String>,
}

/// A customer's request for plumbing work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: DbId,
    pub customer_id: DbId,
    pub title: String,
    pub description: String,
    pub status: JobStatus,
    pub urgency: Urgency,
    pub service_type: String,
    pub location: JobLocation,
    /// Whole pounds. `None` when the customer asked for quotes without a budget.
    pub budget: Option<i64>,
    pub quote_count: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

fn validate_postcode(value: &str) -> Result<(), ValidationError> {
    if geo::is_full_postcode(value) {
        Ok(())
    } else {
        let mut err = ValidationError::new("postcode");
        err.message = Some("must be a valid UK postcode".into());
        Err(err)
    }
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}

/// DTO for `POST /api/jobs`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewJob {
    #[validate(length(min = 5, max = 120, message = "must be 5-120 characters"))]
    pub title: String,
    #[validate(length(min = 20, max = 5000, message = "must be 20-5000 characters"))]
    pub description: String,
    pub urgency: Urgency,
    #[validate(custom(function = "validate_not_blank"))]
    pub service_type: String,
    #[validate(custom(function = "validate_postcode"))]
    pub postcode: String,
    pub town: Option<String>,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub budget: Option<i64>,
}

impl NewJob {
    /// Validate and return a copy with normalised postcode and trimmed text.
    pub fn normalized(&self) -> Result<NewJob, CoreError> {
        self.validate()?;
        Ok(NewJob {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            urgency: self.urgency,
            service_type: self.service_type.trim().to_lowercase(),
            postcode: geo::normalize_postcode(&self.postcode),
            town: self
                .town
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
            budget: self.budget,
        })
    }
}

/// DTO for `PATCH /api/jobs/{id}/status`.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateJobStatus {
    pub status: JobStatus,
}

// ---------------------------------------------------------------------------
// Wire view
// ---------------------------------------------------------------------------

/// A job as returned to HTTP clients: camelCase keys, ISO-8601 timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobView {
    pub id: DbId,
    pub customer_id: DbId,
    pub title: String,
    pub description: String,
    pub status: JobStatus,
    pub urgency: Urgency,
    pub service_type: String,
    pub postcode: String,
    pub town: Option<String>,
    pub city_slug: Option<String>,
    pub coordinates: Option<GeoPoint>,
    pub budget: Option<i64>,
    pub quote_count: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_miles: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
}

/// Render a timestamp as RFC 3339 in UTC, keeping every fractional digit the
/// value carries (none, millis, micros or nanos).
pub fn to_iso8601(ts: &Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

impl JobView {
    pub fn from_job(job: &Job, distance_miles: Option<f64>) -> Self {
        Self {
            id: job.id,
            customer_id: job.customer_id,
            title: job.title.clone(),
            description: job.description.clone(),
            status: job.status,
            urgency: job.urgency,
            service_type: job.service_type.clone(),
            postcode: job.location.postcode.clone(),
            town: job.location.town.clone(),
            city_slug: job.location.city_slug.clone(),
            coordinates: job.location.coordinates,
            budget: job.budget,
            quote_count: job.quote_count,
            distance_miles: distance_miles.map(|d| (d * 10.0).round() / 10.0),
            created_at: to_iso8601(&job.created_at),
            updated_at: to_iso8601(&job.updated_at),
        }
    }
}

impl From<&Job> for JobView {
    fn from(job: &Job) -> Self {
        Self::from_job(job, None)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use assert_matches::assert_matches;
    use chrono::{DateTime, TimeZone, Utc};

    use super::*;

    /// Build an open job with sensible defaults for tests in this crate.
    pub(crate) fn sample_job(id: DbId, created_at: Timestamp) -> Job {
        Job {
            id,
            customer_id: 100,
            title: format!("Job {id}"),
            description: "Kitchen tap dripping constantly".to_string(),
            status: JobStatus::Open,
            urgency: Urgency::Soon,
            service_type: "repairs".to_string(),
            location: JobLocation {
                postcode: "M1 1AE".to_string(),
                town: Some("Manchester".to_string()),
                city_slug: Some("manchester".to_string()),
                coordinates: Some(GeoPoint::new(53.4808, -2.2426)),
            },
            budget: Some(150),
            quote_count: 0,
            created_at,
            updated_at: created_at,
        }
    }

    fn new_job() -> NewJob {
        NewJob {
            title: "  Leaking radiator valve ".into(),
            description: "Radiator valve in the hallway leaks when heating is on".into(),
            urgency: Urgency::Urgent,
            service_type: " Heating ".into(),
            postcode: "sw1a1aa".into(),
            town: Some("  ".into()),
            budget: Some(200),
        }
    }

    #[test]
    fn open_job_can_be_quoted_assigned_or_cancelled() {
        assert!(JobStatus::Open.can_transition_to(JobStatus::Quoted));
        assert!(JobStatus::Open.can_transition_to(JobStatus::Assigned));
        assert!(JobStatus::Open.can_transition_to(JobStatus::Cancelled));
        assert!(!JobStatus::Open.can_transition_to(JobStatus::Completed));
    }

    #[test]
    fn terminal_states_never_transition() {
        for next in [
            JobStatus::Open,
            JobStatus::Quoted,
            JobStatus::Assigned,
            JobStatus::Completed,
        ] {
            assert!(!JobStatus::Completed.can_transition_to(next));
            assert!(!JobStatus::Cancelled.can_transition_to(next));
        }
        assert!(JobStatus::Cancelled.is_terminal());
    }

    #[test]
    fn invalid_transition_is_validation_error() {
        assert_matches!(
            JobStatus::Assigned.transition(JobStatus::Quoted),
            Err(CoreError::Validation(msg)) if msg.contains("'assigned' to 'quoted'")
        );
    }

    #[test]
    fn terminal_job_reports_it_is_closed() {
        assert_matches!(
            JobStatus::Completed.transition(JobStatus::Open),
            Err(CoreError::Validation(msg)) if msg == "Job is already completed and can no longer change"
        );
    }

    #[test]
    fn urgency_rank_orders_emergency_first() {
        let mut all = vec![
            Urgency::Flexible,
            Urgency::Emergency,
            Urgency::Soon,
            Urgency::Urgent,
        ];
        all.sort_by_key(Urgency::rank);
        assert_eq!(
            all,
            vec![
                Urgency::Emergency,
                Urgency::Urgent,
                Urgency::Soon,
                Urgency::Flexible,
            ]
        );
    }

    #[test]
    fn status_round_trips_through_str() {
        for s in ["open", "quoted", "assigned", "completed", "cancelled"] {
            assert_eq!(JobStatus::from_str(s).unwrap().as_str(), s);
        }
        assert!(JobStatus::from_str("archived").is_err());
    }

    #[test]
    fn new_job_is_normalized() {
        let job = new_job().normalized().expect("valid job");
        assert_eq!(job.title, "Leaking radiator valve");
        assert_eq!(job.service_type, "heating");
        assert_eq!(job.postcode, "SW1A 1AA");
        assert_eq!(job.town, None);
    }

    #[test]
    fn new_job_rejects_bad_fields() {
        let mut input = new_job();
        input.title = "Tap".into();
        input.postcode = "not a postcode".into();
        input.budget = Some(-5);

        let err = input.normalized().unwrap_err();
        let CoreError::InvalidFields(fields) = err else {
            panic!("expected InvalidFields");
        };
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("postcode"));
        assert!(fields.contains_key("budget"));
        assert_eq!(fields["postcode"], vec!["must be a valid UK postcode".to_string()]);
    }

    #[test]
    fn view_uses_iso8601_timestamps() {
        let created = Utc.with_ymd_and_hms(2024, 2, 1, 9, 30, 0).unwrap();
        let view = JobView::from(&sample_job(1, created));
        assert_eq!(view.created_at, "2024-02-01T09:30:00Z");

        let with_millis = Utc.timestamp_millis_opt(1_706_780_000_123).unwrap();
        assert_eq!(to_iso8601(&with_millis), "2024-02-01T09:33:20.123Z");
    }

    #[test]
    fn iso8601_round_trip_preserves_database_precision() {
        // TIMESTAMPTZ keeps microseconds.
        let created = Utc.timestamp_micros(1_706_780_000_123_456).unwrap();
        let rendered = to_iso8601(&created);
        assert_eq!(rendered, "2024-02-01T09:33:20.123456Z");

        let parsed: DateTime<Utc> = DateTime::parse_from_rfc3339(&rendered)
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(parsed, created);
    }

    #[test]
    fn iso8601_round_trip_preserves_nanoseconds() {
        let created = Utc::now();
        let parsed: DateTime<Utc> = DateTime::parse_from_rfc3339(&to_iso8601(&created))
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(parsed, created);
    }

    #[test]
    fn view_serializes_camel_case() {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let json = serde_json::to_value(JobView::from(&sample_job(7, created))).unwrap();
        assert_eq!(json["quoteCount"], 0);
        assert_eq!(json["serviceType"], "repairs");
        assert!(json.get("distanceMiles").is_none());
    }
}
