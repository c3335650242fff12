//! UK postcode geocoding against a postcodes.io-compatible API.
//!
//! [`PostcodesIo`] implements the `Geocoder` port: full postcode lookups,
//! outcode (district centroid) lookups, and reverse lookups from a point to
//! the nearest postcode's administrative district.

use std::time::Duration;

use async_trait::async_trait;
use portal_core::error::CoreError;
use portal_core::geo::GeoPoint;
use portal_core::ports::{GeocodedPlace, Geocoder};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Geocoder endpoint settings.
#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl GeocoderConfig {
    /// Load geocoder configuration from environment variables.
    ///
    /// | Env Var                 | Default                    |
    /// |-------------------------|----------------------------|
    /// | `GEOCODER_BASE_URL`     | `https://api.postcodes.io` |
    /// | `GEOCODER_TIMEOUT_SECS` | `5`                        |
    pub fn from_env() -> Self {
        let base_url = std::env::var("GEOCODER_BASE_URL")
            .unwrap_or_else(|_| "https://api.postcodes.io".into())
            .trim_end_matches('/')
            .to_string();

        let timeout_secs: u64 = std::env::var("GEOCODER_TIMEOUT_SECS")
            .unwrap_or_else(|_| "5".into())
            .parse()
            .expect("GEOCODER_TIMEOUT_SECS must be a valid u64");

        Self {
            base_url,
            timeout_secs,
        }
    }
}

/// Errors from the geocoding API layer.
#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API returned a non-2xx status other than 404.
    #[error("Geocoder API error ({status}): {body}")]
    ApiError { status: u16, body: String },
}

impl From<GeocodeError> for CoreError {
    fn from(err: GeocodeError) -> Self {
        CoreError::Upstream {
            service: "geocoder",
            message: err.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct PostcodeResult {
    latitude: Option<f64>,
    longitude: Option<f64>,
    admin_district: Option<String>,
}

/// Outcodes can straddle districts, so the district comes back as a list.
#[derive(Debug, Deserialize)]
struct OutcodeResult {
    latitude: Option<f64>,
    longitude: Option<f64>,
    #[serde(default)]
    admin_district: Vec<String>,
}

fn place(
    latitude: Option<f64>,
    longitude: Option<f64>,
    admin_district: Option<String>,
) -> Option<GeocodedPlace> {
    let point = GeoPoint::new(latitude?, longitude?);
    point.is_valid().then_some(GeocodedPlace {
        point,
        admin_district,
    })
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// postcodes.io HTTP client.
#[derive(Clone)]
pub struct PostcodesIo {
    client: reqwest::Client,
    base_url: String,
}

impl PostcodesIo {
    /// Build a client with the configured request timeout.
    pub fn new(config: &GeocoderConfig) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self::with_client(client, config.base_url.clone()))
    }

    pub fn with_client(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    /// GET `path` (plus query), treating 404 as "no result".
    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, GeocodeError> {
        let response = self
            .client
            .get(format!("{}{path}", self.base_url))
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(GeocodeError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        let envelope = response.json::<Envelope<T>>().await?;
        Ok(envelope.result)
    }

    pub async fn postcode(&self, postcode: &str) -> Result<Option<GeocodedPlace>, GeocodeError> {
        let result: Option<PostcodeResult> = self
            .get(&format!("/postcodes/{}", encode_segment(postcode)), &[])
            .await?;
        Ok(result.and_then(|r| place(r.latitude, r.longitude, r.admin_district)))
    }

    pub async fn outcode(&self, outcode: &str) -> Result<Option<GeocodedPlace>, GeocodeError> {
        let result: Option<OutcodeResult> = self
            .get(&format!("/outcodes/{}", encode_segment(outcode)), &[])
            .await?;
        Ok(result.and_then(|r| {
            place(
                r.latitude,
                r.longitude,
                r.admin_district.into_iter().next(),
            )
        }))
    }

    pub async fn nearest(&self, point: GeoPoint) -> Result<Option<GeocodedPlace>, GeocodeError> {
        let query = [
            ("lon", point.lng.to_string()),
            ("lat", point.lat.to_string()),
            ("limit", "1".to_string()),
        ];
        let result: Option<Vec<PostcodeResult>> = self.get("/postcodes", &query).await?;
        Ok(result
            .and_then(|rows| rows.into_iter().next())
            .and_then(|r| place(r.latitude, r.longitude, r.admin_district)))
    }
}

/// The API accepts postcodes with or without the inner space.
fn encode_segment(raw: &str) -> String {
    raw.split_whitespace().collect()
}

#[async_trait]
impl Geocoder for PostcodesIo {
    async fn lookup_postcode(&self, postcode: &str) -> Result<Option<GeocodedPlace>, CoreError> {
        Ok(self.postcode(postcode).await?)
    }

    async fn lookup_outcode(&self, outcode: &str) -> Result<Option<GeocodedPlace>, CoreError> {
        Ok(self.outcode(outcode).await?)
    }

    async fn reverse(&self, point: GeoPoint) -> Result<Option<GeocodedPlace>, CoreError> {
        Ok(self.nearest(point).await?)
    }
}
