//! Job search service behind `GET /api/jobs/search`.
//!
//! A search first resolves the `location` parameter (postcodes are geocoded,
//! place names become slug filters), then queries the search index while the
//! open-job count is read from the primary store. When the index has no
//! matches, fails, or is not configured, the same filter is evaluated in
//! memory over every open job from the primary store.

use chrono::Utc;
use portal_core::error::CoreError;
use portal_core::fallback::{self, MatchStats};
use portal_core::geo::GeoPoint;
use portal_core::job::{JobView, Urgency};
use portal_core::ports::{self, Geocoder, IndexPage, JobIndexQuery, SearchIndex, Store};
use portal_core::search_params::{JobFilter, LocationFilter, SearchParams, SortBy};
use portal_core::types::Timestamp;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Which engine produced the results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchSource {
    Index,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: u64) -> Self {
        let limit_u = limit.max(1) as u64;
        let total_pages = total.div_ceil(limit_u);
        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: (page as u64) < total_pages,
            has_prev: page > 1,
        }
    }
}

/// The filters actually applied, echoed back to the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedFilters {
    pub q: Option<String>,
    pub urgency: Vec<Urgency>,
    pub service_type: Vec<String>,
    pub specialties: Vec<String>,
    pub city: Option<String>,
    pub location: Option<String>,
    /// Set when `location` was geocoded to a point.
    pub coordinates: Option<GeoPoint>,
    pub radius: Option<i64>,
    pub min_budget: Option<i64>,
    pub max_budget: Option<i64>,
    pub no_quotes: bool,
    pub date_posted: Option<i64>,
    pub sort_by: SortBy,
}

impl AppliedFilters {
    fn new(params: &SearchParams, filter: &JobFilter) -> Self {
        let coordinates = match &filter.location {
            Some(LocationFilter::Near { point, .. }) => Some(*point),
            _ => None,
        };
        Self {
            q: params.q.clone(),
            urgency: params.urgency.clone(),
            service_type: params.service_types.clone(),
            specialties: params.specialties.clone(),
            city: params.city_slug.clone(),
            location: params.location.clone(),
            coordinates,
            radius: coordinates.map(|_| params.radius_miles),
            min_budget: params.min_budget,
            max_budget: params.max_budget,
            no_quotes: params.no_quotes,
            date_posted: params.date_posted_days,
            sort_by: params.sort_by,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchStats {
    /// Open jobs in the primary store, regardless of filters.
    pub total_available: u64,
    pub filtered_count: u64,
    pub emergency_count: u64,
    pub average_budget: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobSearchResponse {
    pub jobs: Vec<JobView>,
    pub pagination: Pagination,
    pub filters: AppliedFilters,
    pub stats: SearchStats,
    pub source: SearchSource,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Borrowed view of the backends a search needs.
pub struct JobSearch<'a> {
    pub store: &'a dyn Store,
    pub index: Option<&'a dyn SearchIndex>,
    pub geocoder: &'a dyn Geocoder,
}

impl JobSearch<'_> {
    /// Turn the `location` parameter into a filter. Geocoding problems never
    /// fail the search; they degrade to a place-name match.
    pub async fn resolve_location(&self, params: &SearchParams) -> Option<LocationFilter> {
        let raw = params.location.as_deref()?;

        if !params.location_is_postcode() {
            return Some(LocationFilter::place(raw));
        }

        match ports::geocode_postcode(self.geocoder, raw).await {
            Ok(Some(place)) => Some(LocationFilter::Near {
                point: place.point,
                radius_miles: u32::try_from(params.radius_miles).unwrap_or(0),
            }),
            Ok(None) => {
                tracing::debug!(location = raw, "Postcode not found, matching as place");
                Some(LocationFilter::place(raw))
            }
            Err(e) => {
                tracing::warn!(location = raw, error = %e, "Geocoding failed, matching as place");
                Some(LocationFilter::place(raw))
            }
        }
    }

    /// Run a validated search at `now`.
    pub async fn run(
        &self,
        params: &SearchParams,
        now: Timestamp,
    ) -> Result<JobSearchResponse, CoreError> {
        let location = self.resolve_location(params).await;
        let filter = params.to_filter(location, now);
        let filters = AppliedFilters::new(params, &filter);

        if let Some(index) = self.index {
            let query = JobIndexQuery {
                filter: filter.clone(),
                sort: params.sort_by,
                page: u32::try_from(params.page).unwrap_or(u32::MAX),
                limit: u32::try_from(params.limit).unwrap_or(u32::MAX),
            };

            let (result, total_available) =
                tokio::join!(index.search_jobs(&query), self.store.count_open_jobs());
            let total_available = total_available?;

            match result {
                Ok(page) if page.total > 0 => {
                    tracing::info!(
                        source = "index",
                        hits = page.hits.len(),
                        total = page.total,
                        page = params.page,
                        sort = params.sort_by.as_str(),
                        "Job search served"
                    );
                    return Ok(from_index(params, filters, page, total_available));
                }
                Ok(_) => tracing::info!("Search index returned no hits, using fallback"),
                Err(e) => tracing::warn!(error = %e, "Search index query failed, using fallback"),
            }
        } else {
            tracing::debug!("No search index configured, using fallback");
        }

        let open_jobs = self.store.list_open_jobs().await?;
        let total_available = open_jobs.len() as u64;
        let page = fallback::search(
            open_jobs,
            &filter,
            params.sort_by,
            params.offset(),
            params.limit.max(0) as usize,
        );

        tracing::info!(
            source = "fallback",
            hits = page.jobs.len(),
            total = page.stats.filtered_count,
            page = params.page,
            sort = params.sort_by.as_str(),
            "Job search served"
        );

        let jobs = page
            .jobs
            .iter()
            .map(|m| JobView::from_job(&m.job, m.distance_miles))
            .collect();

        Ok(from_stats(
            params,
            filters,
            jobs,
            page.stats,
            total_available,
            SearchSource::Fallback,
        ))
    }
}

/// Convenience wrapper using the current time.
pub async fn search_jobs(
    search: &JobSearch<'_>,
    params: &SearchParams,
) -> Result<JobSearchResponse, CoreError> {
    search.run(params, Utc::now()).await
}

fn from_index(
    params: &SearchParams,
    filters: AppliedFilters,
    page: IndexPage,
    total_available: u64,
) -> JobSearchResponse {
    let jobs = page
        .hits
        .iter()
        .map(|hit| JobView::from_job(&hit.job, hit.distance_miles))
        .collect();
    let stats = MatchStats {
        filtered_count: page.total,
        emergency_count: page.emergency_count,
        average_budget: page.average_budget,
    };
    from_stats(params, filters, jobs, stats, total_available, SearchSource::Index)
}

fn from_stats(
    params: &SearchParams,
    filters: AppliedFilters,
    jobs: Vec<JobView>,
    stats: MatchStats,
    total_available: u64,
    source: SearchSource,
) -> JobSearchResponse {
    JobSearchResponse {
        jobs,
        pagination: Pagination::new(params.page, params.limit, stats.filtered_count),
        filters,
        stats: SearchStats {
            total_available,
            filtered_count: stats.filtered_count,
            emergency_count: stats.emergency_count,
            average_budget: stats.average_budget,
        },
        source,
    }
}
