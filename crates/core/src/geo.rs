//! Geographic helpers: coordinates, distances, UK postcode handling.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Mean Earth radius in miles (haversine).
const EARTH_RADIUS_MILES: f64 = 3958.8;

/// Meters per statute mile.
pub const METERS_PER_MILE: f64 = 1609.344;

/// Full UK postcode, uppercase, optional single inner space.
static POSTCODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z]{1,2}[0-9][A-Z0-9]? ?[0-9][A-Z]{2}$").expect("valid regex")
});

/// Outward code only (the part before the space), e.g. `SW1A` or `M1`.
static OUTCODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{1,2}[0-9][A-Z0-9]?$").expect("valid regex"));

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether both components are finite and within WGS84 bounds.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Great-circle distance between two points in miles.
pub fn haversine_miles(a: GeoPoint, b: GeoPoint) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_MILES * h.sqrt().asin()
}

/// Convert a radius in whole miles to whole meters (rounded).
pub fn miles_to_meters(miles: u32) -> u32 {
    (f64::from(miles) * METERS_PER_MILE).round() as u32
}

/// Normalise a postcode-like string: uppercase, internal whitespace removed,
/// then a single space inserted before the inward code when long enough.
///
/// ```
/// use portal_core::geo::normalize_postcode;
/// assert_eq!(normalize_postcode(" sw1a  1aa "), "SW1A 1AA");
/// assert_eq!(normalize_postcode("m11ae"), "M1 1AE");
/// assert_eq!(normalize_postcode("m1"), "M1");
/// ```
pub fn normalize_postcode(raw: &str) -> String {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect();

    if compact.len() >= 5 && compact.is_ascii() {
        let split = compact.len() - 3;
        format!("{} {}", &compact[..split], &compact[split..])
    } else {
        compact
    }
}

/// Whether the input is a syntactically valid full UK postcode.
pub fn is_full_postcode(raw: &str) -> bool {
    POSTCODE_RE.is_match(&normalize_postcode(raw))
}

/// Whether the input is a bare outward code such as `LS1` or `SW1A`.
pub fn is_outcode(raw: &str) -> bool {
    OUTCODE_RE.is_match(&normalize_postcode(raw))
}

/// Extract the outward code from a full postcode, or return a bare outcode
/// unchanged. Returns `None` for anything that is not postcode-shaped.
pub fn outcode(raw: &str) -> Option<String> {
    let normalized = normalize_postcode(raw);
    if POSTCODE_RE.is_match(&normalized) {
        normalized.split(' ').next().map(str::to_string)
    } else if OUTCODE_RE.is_match(&normalized) {
        Some(normalized)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_london_to_manchester() {
        let london = GeoPoint::new(51.5074, -0.1278);
        let manchester = GeoPoint::new(53.4808, -2.2426);
        let d = haversine_miles(london, manchester);
        assert!((d - 163.0).abs() < 2.0, "got {d}");
    }

    #[test]
    fn haversine_same_point_is_zero() {
        let p = GeoPoint::new(52.0, -1.0);
        assert!(haversine_miles(p, p).abs() < 1e-9);
    }

    #[test]
    fn miles_to_meters_rounds() {
        assert_eq!(miles_to_meters(0), 0);
        assert_eq!(miles_to_meters(1), 1609);
        assert_eq!(miles_to_meters(10), 16093);
    }

    #[test]
    fn full_postcodes_are_recognised() {
        assert!(is_full_postcode("SW1A 1AA"));
        assert!(is_full_postcode("sw1a1aa"));
        assert!(is_full_postcode("M1 1AE"));
        assert!(is_full_postcode("B33 8TH"));
        assert!(!is_full_postcode("Manchester"));
        assert!(!is_full_postcode("M1"));
    }

    #[test]
    fn outcode_extraction() {
        assert_eq!(outcode("SW1A 1AA").as_deref(), Some("SW1A"));
        assert_eq!(outcode("m11ae").as_deref(), Some("M1"));
        assert_eq!(outcode("LS1").as_deref(), Some("LS1"));
        assert_eq!(outcode("Leeds"), None);
    }

    #[test]
    fn invalid_points_are_flagged() {
        assert!(GeoPoint::new(51.5, -0.1).is_valid());
        assert!(!GeoPoint::new(91.0, 0.0).is_valid());
        assert!(!GeoPoint::new(f64::NAN, 0.0).is_valid());
    }
}
