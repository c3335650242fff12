//! In-memory search over jobs read straight from the primary store.
//!
//! Mirrors the predicates the search index applies so that a search served
//! from here returns the same jobs the index would, minus index lag.

use std::cmp::Ordering;

use serde::Serialize;

use crate::geo::{self, haversine_miles};
use crate::job::{Job, JobStatus, Urgency};
use crate::search_params::{JobFilter, LocationFilter, SortBy};
use crate::slug;

/// A job that passed the filter, with its distance from the search point
/// when the search was geographic.
#[derive(Debug, Clone, PartialEq)]
pub struct Matched {
    pub job: Job,
    pub distance_miles: Option<f64>,
}

/// Aggregate figures over every match (not just the returned page).
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchStats {
    pub filtered_count: u64,
    pub emergency_count: u64,
    pub average_budget: Option<f64>,
}

/// Result of a fallback search: one page plus stats over all matches.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackPage {
    pub jobs: Vec<Matched>,
    pub stats: MatchStats,
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

fn job_city_slug(job: &Job) -> Option<String> {
    slug::first_slug([job.location.city_slug.as_deref(), job.location.town.as_deref()])
}

fn matches_slug(job: &Job, wanted: &str) -> bool {
    job.location.city_slug.as_deref() == Some(wanted)
        || job
            .location
            .town
            .as_deref()
            .and_then(slug::city_slug)
            .is_some_and(|s| s == wanted)
}

fn matches_text(job: &Job, text: &str) -> bool {
    let needle = text.to_lowercase();
    contains_ci(&job.title, &needle)
        || contains_ci(&job.description, &needle)
        || contains_ci(&job.location.postcode, &needle)
        || job
            .location
            .town
            .as_deref()
            .is_some_and(|t| contains_ci(t, &needle))
        || job_city_slug(job).is_some_and(|s| s.contains(&needle))
}

/// Apply `filter` to one job. Returns `None` when it does not match,
/// otherwise the optional distance from the search point.
pub fn evaluate(job: &Job, filter: &JobFilter) -> Option<Option<f64>> {
    if let Some(text) = &filter.text {
        if !matches_text(job, text) {
            return None;
        }
    }

    if !filter.urgency.is_empty() && !filter.urgency.contains(&job.urgency) {
        return None;
    }

    let service = job.service_type.to_lowercase();
    if !filter.service_types.is_empty() && !filter.service_types.contains(&service) {
        return None;
    }
    if !filter.specialties.is_empty() && !filter.specialties.contains(&service) {
        return None;
    }

    if let Some(city) = &filter.city_slug {
        if !matches_slug(job, city) {
            return None;
        }
    }

    if let Some(min) = filter.min_budget {
        if job.budget.map_or(true, |b| b < min) {
            return None;
        }
    }
    if let Some(max) = filter.max_budget {
        if job.budget.map_or(true, |b| b > max) {
            return None;
        }
    }

    if filter.no_quotes && job.quote_count != 0 {
        return None;
    }

    if let Some(since) = filter.posted_since {
        if job.created_at < since {
            return None;
        }
    }

    match &filter.location {
        None => Some(None),
        Some(LocationFilter::Near {
            point,
            radius_miles,
        }) => {
            let coords = job.location.coordinates?;
            let distance = haversine_miles(*point, coords);
            (distance <= f64::from(*radius_miles)).then_some(Some(distance))
        }
        Some(LocationFilter::Place { slug, raw }) => {
            let by_slug = slug.as_deref().is_some_and(|s| matches_slug(job, s));
            let by_postcode = matches_postcode(&job.location.postcode, raw);
            (by_slug || by_postcode).then_some(None)
        }
    }
}

/// A bare outcode (`M1`) matches only that district, never `M11` or `M12`.
/// Anything longer is matched as a prefix of the compacted postcode.
fn matches_postcode(postcode: &str, raw: &str) -> bool {
    let raw = raw.trim();
    if !raw.contains(char::is_whitespace) && geo::is_outcode(raw) {
        return geo::outcode(postcode) == geo::outcode(raw);
    }

    let wanted = geo::normalize_postcode(raw).replace(' ', "");
    !wanted.is_empty() && postcode.replace(' ', "").starts_with(&wanted)
}

/// Order two budgets with missing budgets always last.
fn cmp_budget(a: Option<i64>, b: Option<i64>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) if descending => y.cmp(&x),
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Newest first, then highest id first.
fn cmp_newest(a: &Job, b: &Job) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id))
}

/// Sort matches in place according to `sort`.
pub fn sort_matches(matches: &mut [Matched], sort: SortBy) {
    matches.sort_by(|a, b| {
        let (a, b) = (&a.job, &b.job);
        let primary = match sort {
            SortBy::Newest => Ordering::Equal,
            SortBy::BudgetLow => cmp_budget(a.budget, b.budget, false),
            SortBy::BudgetHigh => cmp_budget(a.budget, b.budget, true),
            SortBy::Urgency => a.urgency.rank().cmp(&b.urgency.rank()),
        };
        primary.then_with(|| cmp_newest(a, b))
    });
}

/// Compute stats over every match.
pub fn stats(matches: &[Matched]) -> MatchStats {
    let budgets: Vec<i64> = matches.iter().filter_map(|m| m.job.budget).collect();
    let average_budget = if budgets.is_empty() {
        None
    } else {
        let sum: i64 = budgets.iter().sum();
        Some(round2(sum as f64 / budgets.len() as f64))
    };

    MatchStats {
        filtered_count: matches.len() as u64,
        emergency_count: matches
            .iter()
            .filter(|m| m.job.urgency == Urgency::Emergency)
            .count() as u64,
        average_budget,
    }
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Run the full fallback pipeline: keep open jobs that pass `filter`, sort,
/// compute stats, then slice out the requested page.
pub fn search(
    jobs: Vec<Job>,
    filter: &JobFilter,
    sort: SortBy,
    offset: usize,
    limit: usize,
) -> FallbackPage {
    let mut matches: Vec<Matched> = jobs
        .into_iter()
        .filter(|job| job.status == JobStatus::Open)
        .filter_map(|job| {
            evaluate(&job, filter).map(|distance_miles| Matched {
                job,
                distance_miles,
            })
        })
        .collect();

    sort_matches(&mut matches, sort);
    let stats = stats(&matches);
    let jobs = matches.into_iter().skip(offset).take(limit).collect();

    FallbackPage { jobs, stats }
}
