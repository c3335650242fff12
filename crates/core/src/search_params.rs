//! Query-parameter parsing and validation for `GET /api/jobs/search`.
//!
//! Every parameter arrives as an optional string. [`RawSearchParams::parse`]
//! turns them into typed [`SearchParams`], collecting every problem into a
//! field-level error map keyed by the wire (camelCase) parameter name.

use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{CoreError, FieldErrors};
use crate::geo::{self, GeoPoint};
use crate::job::Urgency;
use crate::slug;
use crate::types::Timestamp;

/// Default search radius when a location is given without one.
pub const DEFAULT_RADIUS_MILES: i64 = 10;

/// Default and maximum page sizes.
pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 50;

/// Highest page number a search may ask for.
pub const MAX_PAGE: i64 = 10_000;

/// Maximum accepted radius and posted-within window.
pub const MAX_RADIUS_MILES: i64 = 200;
pub const MAX_DATE_POSTED_DAYS: i64 = 365;

// ---------------------------------------------------------------------------
// SortBy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    Newest,
    BudgetLow,
    BudgetHigh,
    Urgency,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::BudgetLow => "budget_low",
            Self::BudgetHigh => "budget_high",
            Self::Urgency => "urgency",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "newest" => Ok(Self::Newest),
            "budget_low" => Ok(Self::BudgetLow),
            "budget_high" => Ok(Self::BudgetHigh),
            "urgency" => Ok(Self::Urgency),
            other => Err(CoreError::Validation(format!("Unknown sort '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Raw parameters
// ---------------------------------------------------------------------------

/// Query string exactly as received.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSearchParams {
    pub q: Option<String>,
    pub urgency: Option<String>,
    pub service_type: Option<String>,
    pub specialties: Option<String>,
    pub city: Option<String>,
    pub location: Option<String>,
    pub radius: Option<String>,
    pub min_budget: Option<String>,
    pub max_budget: Option<String>,
    pub no_quotes: Option<String>,
    pub date_posted: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort_by: Option<String>,
}

// ---------------------------------------------------------------------------
// Validated parameters
// ---------------------------------------------------------------------------

/// Typed, range-checked search parameters.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct SearchParams {
    pub q: Option<String>,
    pub urgency: Vec<Urgency>,
    pub service_types: Vec<String>,
    pub specialties: Vec<String>,
    pub city_slug: Option<String>,
    pub location: Option<String>,
    #[validate(range(min = 0, max = 200, message = "must be between 0 and 200"))]
    pub radius_miles: i64,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub min_budget: Option<i64>,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub max_budget: Option<i64>,
    pub no_quotes: bool,
    #[validate(range(min = 0, max = 365, message = "must be between 0 and 365"))]
    pub date_posted_days: Option<i64>,
    #[validate(range(min = 1, max = 10000, message = "must be between 1 and 10000"))]
    pub page: i64,
    #[validate(range(min = 1, max = 50, message = "must be between 1 and 50"))]
    pub limit: i64,
    pub sort_by: SortBy,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            q: None,
            urgency: Vec::new(),
            service_types: Vec::new(),
            specialties: Vec::new(),
            city_slug: None,
            location: None,
            radius_miles: DEFAULT_RADIUS_MILES,
            min_budget: None,
            max_budget: None,
            no_quotes: false,
            date_posted_days: None,
            page: 1,
            limit: DEFAULT_LIMIT,
            sort_by: SortBy::Newest,
        }
    }
}

/// Map a Rust field name to the query parameter it came from.
fn wire_name(field: &str) -> &str {
    match field {
        "radius_miles" => "radius",
        "min_budget" => "minBudget",
        "max_budget" => "maxBudget",
        "date_posted_days" => "datePosted",
        "sort_by" => "sortBy",
        "service_types" => "serviceType",
        other => other,
    }
}

fn push_error(errors: &mut FieldErrors, field: &str, message: impl Into<String>) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.into());
}

/// Trim and drop blank values.
fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn parse_int(errors: &mut FieldErrors, field: &str, value: &Option<String>) -> Option<i64> {
    let raw = non_blank(value)?;
    match raw.parse::<i64>() {
        Ok(n) => Some(n),
        Err(_) => {
            push_error(errors, field, format!("must be an integer, got '{raw}'"));
            None
        }
    }
}

fn parse_bool(errors: &mut FieldErrors, field: &str, value: &Option<String>) -> bool {
    match non_blank(value).map(str::to_ascii_lowercase).as_deref() {
        None | Some("false") | Some("0") => false,
        Some("true") | Some("1") => true,
        Some(other) => {
            push_error(errors, field, format!("must be true or false, got '{other}'"));
            false
        }
    }
}

/// Split a comma-separated list, trimming and de-duplicating entries.
fn split_list(value: &Option<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    if let Some(raw) = non_blank(value) {
        for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let item = item.to_lowercase();
            if !out.contains(&item) {
                out.push(item);
            }
        }
    }
    out
}

impl RawSearchParams {
    /// Parse and validate. On failure every offending parameter is reported.
    pub fn parse(&self) -> Result<SearchParams, CoreError> {
        let mut errors = FieldErrors::new();

        let mut urgency = Vec::new();
        for item in split_list(&self.urgency) {
            match Urgency::from_str(&item) {
                Ok(u) => urgency.push(u),
                Err(_) => push_error(&mut errors, "urgency", format!("unknown urgency '{item}'")),
            }
        }

        let sort_by = match non_blank(&self.sort_by) {
            None => SortBy::Newest,
            Some(raw) => SortBy::from_str(raw).unwrap_or_else(|_| {
                push_error(&mut errors, "sortBy", format!("unknown sort '{raw}'"));
                SortBy::Newest
            }),
        };

        let radius = parse_int(&mut errors, "radius", &self.radius);
        let min_budget = parse_int(&mut errors, "minBudget", &self.min_budget);
        let max_budget = parse_int(&mut errors, "maxBudget", &self.max_budget);
        let date_posted_days = parse_int(&mut errors, "datePosted", &self.date_posted);
        let page = parse_int(&mut errors, "page", &self.page);
        let limit = parse_int(&mut errors, "limit", &self.limit);
        let no_quotes = parse_bool(&mut errors, "noQuotes", &self.no_quotes);

        let params = SearchParams {
            q: non_blank(&self.q).map(str::to_string),
            urgency,
            service_types: split_list(&self.service_type),
            specialties: split_list(&self.specialties),
            city_slug: non_blank(&self.city).and_then(slug::city_slug),
            location: non_blank(&self.location).map(str::to_string),
            radius_miles: radius.unwrap_or(DEFAULT_RADIUS_MILES),
            min_budget,
            max_budget,
            no_quotes,
            date_posted_days,
            page: page.unwrap_or(1),
            limit: limit.unwrap_or(DEFAULT_LIMIT),
            sort_by,
        };

        if let Err(validation) = params.validate() {
            for (field, errs) in validation.field_errors() {
                for e in errs.iter() {
                    let message = match &e.message {
                        Some(msg) => msg.to_string(),
                        None => e.code.to_string(),
                    };
                    push_error(&mut errors, wire_name(&field), message);
                }
            }
        }

        if let (Some(min), Some(max)) = (params.min_budget, params.max_budget) {
            if min > max {
                push_error(&mut errors, "maxBudget", "must be greater than or equal to minBudget");
            }
        }

        if errors.is_empty() {
            Ok(params)
        } else {
            Err(CoreError::InvalidFields(errors))
        }
    }
}

// ---------------------------------------------------------------------------
// Resolved filter
// ---------------------------------------------------------------------------

/// How a `location` parameter restricts results once geocoding has run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LocationFilter {
    /// Within `radius_miles` of a geocoded point.
    Near { point: GeoPoint, radius_miles: u32 },
    /// A place name (or an un-geocodable postcode) matched by slug / prefix.
    Place { slug: Option<String>, raw: String },
}

impl LocationFilter {
    pub fn radius_meters(&self) -> Option<u32> {
        match self {
            Self::Near { radius_miles, .. } => Some(geo::miles_to_meters(*radius_miles)),
            Self::Place { .. } => None,
        }
    }

    /// Fallback used when `raw` could not (or should not) be geocoded.
    pub fn place(raw: &str) -> Self {
        Self::Place {
            slug: slug::city_slug(raw),
            raw: raw.to_string(),
        }
    }
}

/// Every predicate a search applies, independent of the engine running it.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobFilter {
    pub text: Option<String>,
    pub urgency: Vec<Urgency>,
    pub service_types: Vec<String>,
    pub specialties: Vec<String>,
    pub city_slug: Option<String>,
    pub location: Option<LocationFilter>,
    pub min_budget: Option<i64>,
    pub max_budget: Option<i64>,
    pub no_quotes: bool,
    pub posted_since: Option<Timestamp>,
}

impl SearchParams {
    /// Whether the `location` parameter looks like a UK postcode or outcode
    /// and is therefore worth geocoding.
    pub fn location_is_postcode(&self) -> bool {
        self.location
            .as_deref()
            .is_some_and(|l| geo::is_full_postcode(l) || geo::is_outcode(l))
    }

    /// Cut-off for `datePosted`: `0` means since the start of today (UTC).
    pub fn posted_since(&self, now: Timestamp) -> Option<Timestamp> {
        self.date_posted_days.map(|days| {
            if days == 0 {
                now.date_naive().and_time(NaiveTime::MIN).and_utc()
            } else {
                now - Duration::days(days)
            }
        })
    }

    /// Build the engine-independent filter. `location` is the geocoding
    /// outcome for [`SearchParams::location`].
    pub fn to_filter(&self, location: Option<LocationFilter>, now: Timestamp) -> JobFilter {
        JobFilter {
            text: self.q.clone(),
            urgency: self.urgency.clone(),
            service_types: self.service_types.clone(),
            specialties: self.specialties.clone(),
            city_slug: self.city_slug.clone(),
            location,
            min_budget: self.min_budget,
            max_budget: self.max_budget,
            no_quotes: self.no_quotes,
            posted_since: self.posted_since(now),
        }
    }

    /// Zero-based offset of the first row on the requested page.
    pub fn offset(&self) -> usize {
        let offset = self.page.saturating_sub(1).saturating_mul(self.limit);
        usize::try_from(offset).unwrap_or(0)
    }
}
