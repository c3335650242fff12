//! Ports: the traits through which handlers and background services reach
//! the document store, the search index and the geocoder.
//!
//! Adapters map their own failures into [`CoreError`] so callers can treat
//! every backend uniformly.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::geo::{self, GeoPoint};
use crate::index_record::{JobRecord, TradespersonRecord};
use crate::job::{DerivedLocation, Job, JobStatus, NewJob};
use crate::quote::{NewQuote, Quote};
use crate::search_params::{JobFilter, SortBy};
use crate::types::DbId;
use crate::user::{UpdateProfile, User};

// ---------------------------------------------------------------------------
// Document store
// ---------------------------------------------------------------------------

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn find_job(&self, id: DbId) -> Result<Option<Job>, CoreError>;

    /// Every job whose status is `open`.
    async fn list_open_jobs(&self) -> Result<Vec<Job>, CoreError>;

    async fn count_open_jobs(&self) -> Result<u64, CoreError>;

    /// Persist a validated, normalised job as `open`, along with whatever
    /// location fields were derived from its postcode.
    async fn create_job(
        &self,
        customer_id: DbId,
        input: &NewJob,
        derived: &DerivedLocation,
    ) -> Result<Job, CoreError>;

    /// Returns `None` when the job does not exist.
    async fn update_job_status(&self, id: DbId, status: JobStatus)
        -> Result<Option<Job>, CoreError>;

    /// Returns `false` when the job did not exist.
    async fn delete_job(&self, id: DbId) -> Result<bool, CoreError>;
}

#[async_trait]
pub trait QuoteStore: Send + Sync {
    /// Insert a pending quote and bump the job's `quote_count` atomically.
    async fn create_quote(
        &self,
        job_id: DbId,
        tradesperson_id: DbId,
        input: &NewQuote,
    ) -> Result<Quote, CoreError>;

    async fn count_pending_quotes(&self, tradesperson_id: DbId) -> Result<i64, CoreError>;

    async fn has_quoted(&self, job_id: DbId, tradesperson_id: DbId) -> Result<bool, CoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, id: DbId) -> Result<Option<User>, CoreError>;

    /// Apply a normalised profile patch. Returns `None` when the user is gone.
    async fn update_profile(
        &self,
        id: DbId,
        patch: &UpdateProfile,
    ) -> Result<Option<User>, CoreError>;
}

/// The whole primary store behind one handle.
#[async_trait]
pub trait Store: JobStore + QuoteStore + UserStore {
    /// Verify the backing database is reachable.
    async fn health_check(&self) -> Result<(), CoreError>;
}

// ---------------------------------------------------------------------------
// Search index
// ---------------------------------------------------------------------------

/// A job search as handed to the index.
#[derive(Debug, Clone, PartialEq)]
pub struct JobIndexQuery {
    pub filter: JobFilter,
    pub sort: SortBy,
    /// One-based page number.
    pub page: u32,
    pub limit: u32,
}

/// A hit returned by the index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHit {
    pub job: Job,
    pub distance_miles: Option<f64>,
}

/// One page of index results plus the aggregates the index computed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IndexPage {
    pub hits: Vec<IndexHit>,
    pub total: u64,
    pub emergency_count: u64,
    pub average_budget: Option<f64>,
}

#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn search_jobs(&self, query: &JobIndexQuery) -> Result<IndexPage, CoreError>;

    async fn upsert_job(&self, record: &JobRecord) -> Result<(), CoreError>;

    async fn delete_job(&self, id: DbId) -> Result<(), CoreError>;

    async fn upsert_tradesperson(&self, record: &TradespersonRecord) -> Result<(), CoreError>;

    async fn delete_tradesperson(&self, id: DbId) -> Result<(), CoreError>;
}

// ---------------------------------------------------------------------------
// Geocoder
// ---------------------------------------------------------------------------

/// A geocoding answer: coordinates plus the administrative district, when
/// the provider knows it.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedPlace {
    pub point: GeoPoint,
    pub admin_district: Option<String>,
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Look up a full postcode. `Ok(None)` means "no such postcode".
    async fn lookup_postcode(&self, postcode: &str) -> Result<Option<GeocodedPlace>, CoreError>;

    /// Look up an outward code (e.g. `LS1`), giving its centroid.
    async fn lookup_outcode(&self, outcode: &str) -> Result<Option<GeocodedPlace>, CoreError>;

    /// Nearest known place to a point.
    async fn reverse(&self, point: GeoPoint) -> Result<Option<GeocodedPlace>, CoreError>;
}

/// Geocode a postcode-like string: full postcode first, then outcode-level
/// precision. Failures of the full lookup fall through to the outcode.
pub async fn geocode_postcode(
    geocoder: &dyn Geocoder,
    raw: &str,
) -> Result<Option<GeocodedPlace>, CoreError> {
    let mut full_error = None;

    if geo::is_full_postcode(raw) {
        match geocoder.lookup_postcode(&geo::normalize_postcode(raw)).await {
            Ok(Some(place)) => return Ok(Some(place)),
            Ok(None) => {}
            Err(e) => full_error = Some(e),
        }
    }

    match geo::outcode(raw) {
        Some(outcode) => match geocoder.lookup_outcode(&outcode).await {
            Ok(found) => Ok(found),
            Err(e) => Err(full_error.unwrap_or(e)),
        },
        None => full_error.map_or(Ok(None), Err),
    }
}
