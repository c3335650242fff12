//! Job search request building.
//!
//! Filters become `facetFilters` (values OR'd within an inner array, arrays
//! AND'd together) and `numericFilters`; a geographic location becomes
//! `aroundLatLng` / `aroundRadius`. Sorting is served by replica indices.

use portal_core::ports::JobIndexQuery;
use portal_core::search_params::{LocationFilter, SortBy};
use serde::Serialize;

/// Facets requested on every job search: urgency counts give the emergency
/// count, budget stats give the average.
pub const JOB_FACETS: [&str; 2] = ["urgency", "budget"];

/// Body of an Algolia query request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub facet_filters: Vec<Vec<String>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub numeric_filters: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub around_lat_lng: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub around_radius: Option<u32>,
    pub get_ranking_info: bool,
    /// Zero-based.
    pub page: u32,
    pub hits_per_page: u32,
    pub facets: Vec<String>,
}

/// Index that serves `sort` for the base jobs index `base`.
pub fn replica_for(base: &str, sort: SortBy) -> String {
    match sort {
        SortBy::Newest => base.to_string(),
        SortBy::BudgetLow => format!("{base}_budget_asc"),
        SortBy::BudgetHigh => format!("{base}_budget_desc"),
        SortBy::Urgency => format!("{base}_urgency"),
    }
}

/// `field:value` for each value; `None` when there are no values.
fn any_of<I, S>(field: &str, values: I) -> Option<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let out: Vec<String> = values
        .into_iter()
        .map(|v| format!("{field}:{}", v.as_ref()))
        .collect();
    (!out.is_empty()).then_some(out)
}

/// Build the Algolia request for a job search.
pub fn build_job_search(query: &JobIndexQuery) -> SearchRequest {
    let filter = &query.filter;

    let mut facet_filters: Vec<Vec<String>> = vec![vec!["status:open".to_string()]];
    facet_filters.extend(any_of("urgency", filter.urgency.iter().map(|u| u.as_str())));
    facet_filters.extend(any_of("serviceType", &filter.service_types));
    facet_filters.extend(any_of("specialties", &filter.specialties));
    facet_filters.extend(any_of("citySlug", &filter.city_slug));

    let mut around_lat_lng = None;
    let mut around_radius = None;
    match &filter.location {
        Some(near @ LocationFilter::Near { point, .. }) => {
            around_lat_lng = Some(format!("{}, {}", point.lat, point.lng));
            // Algolia rejects a zero radius.
            around_radius = near.radius_meters().map(|m| m.max(1));
        }
        Some(LocationFilter::Place { slug, .. }) => {
            facet_filters.extend(any_of("citySlug", slug));
        }
        None => {}
    }

    let mut numeric_filters = Vec::new();
    if let Some(min) = filter.min_budget {
        numeric_filters.push(format!("budget>={min}"));
    }
    if let Some(max) = filter.max_budget {
        numeric_filters.push(format!("budget<={max}"));
    }
    if filter.no_quotes {
        numeric_filters.push("quoteCount=0".to_string());
    }
    if let Some(since) = filter.posted_since {
        numeric_filters.push(format!("createdAt>={}", since.timestamp_millis()));
    }

    SearchRequest {
        query: filter.text.clone().unwrap_or_default(),
        facet_filters,
        numeric_filters,
        get_ranking_info: around_lat_lng.is_some(),
        around_lat_lng,
        around_radius,
        page: query.page.saturating_sub(1),
        hits_per_page: query.limit,
        facets: JOB_FACETS.iter().map(|f| f.to_string()).collect(),
    }
}
