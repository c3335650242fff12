//! Row structs.
//!
//! Each submodule contains a `FromRow` struct matching the table row and a
//! `TryFrom` conversion into the `portal_core` entity. Enum columns are
//! stored as text and parsed on the way out.

pub mod job;
pub mod quote;
pub mod user;

use portal_core::geo::GeoPoint;

/// Latitude/longitude column pair to an optional point.
pub(crate) fn point(latitude: Option<f64>, longitude: Option<f64>) -> Option<GeoPoint> {
    match (latitude, longitude) {
        (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)),
        _ => None,
    }
}
