//! REST API client for Algolia.
//!
//! Reads go to the DSN host (`{app}-dsn.algolia.net`), writes to the primary
//! host (`{app}.algolia.net`). Every request carries the application id and
//! API key headers.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::query::SearchRequest;

const APP_ID_HEADER: &str = "X-Algolia-Application-Id";
const API_KEY_HEADER: &str = "X-Algolia-API-Key";

/// Algolia credentials and index names.
#[derive(Debug, Clone)]
pub struct AlgoliaConfig {
    pub app_id: String,
    pub api_key: String,
    /// Base jobs index; sort replicas are derived from it.
    pub jobs_index: String,
    pub users_index: String,
}

impl AlgoliaConfig {
    /// Load Algolia configuration from environment variables.
    ///
    /// | Env Var               | Required | Default        |
    /// |-----------------------|----------|----------------|
    /// | `ALGOLIA_APP_ID`      | no       | --             |
    /// | `ALGOLIA_ADMIN_KEY`   | no       | --             |
    /// | `ALGOLIA_JOBS_INDEX`  | no       | `jobs`         |
    /// | `ALGOLIA_USERS_INDEX` | no       | `tradespeople` |
    ///
    /// Returns `None` unless both the app id and the key are set, in which
    /// case search runs against the primary store only.
    pub fn from_env() -> Option<Self> {
        let app_id = std::env::var("ALGOLIA_APP_ID").ok().filter(|s| !s.is_empty())?;
        let api_key = std::env::var("ALGOLIA_ADMIN_KEY")
            .ok()
            .filter(|s| !s.is_empty())?;

        Some(Self {
            app_id,
            api_key,
            jobs_index: std::env::var("ALGOLIA_JOBS_INDEX").unwrap_or_else(|_| "jobs".into()),
            users_index: std::env::var("ALGOLIA_USERS_INDEX")
                .unwrap_or_else(|_| "tradespeople".into()),
        })
    }
}

/// Errors from the Algolia REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum AlgoliaError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Algolia returned a non-2xx status code.
    #[error("Algolia API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

/// Aggregates Algolia reports for a numeric facet.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FacetStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub sum: f64,
}

/// Ranking details returned when `getRankingInfo` is set.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingInfo {
    /// Distance in meters from `aroundLatLng`.
    #[serde(default)]
    pub geo_distance: Option<f64>,
}

/// A single hit: the stored record plus ranking metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct Hit<T> {
    #[serde(flatten)]
    pub record: T,
    #[serde(rename = "_rankingInfo", default)]
    pub ranking_info: Option<RankingInfo>,
}

/// Body of a `POST /1/indexes/{index}/query` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse<T> {
    pub hits: Vec<Hit<T>>,
    pub nb_hits: u64,
    pub page: u32,
    pub nb_pages: u32,
    pub hits_per_page: u32,
    /// Facet name -> value -> count.
    #[serde(default)]
    pub facets: HashMap<String, HashMap<String, u64>>,
    #[serde(rename = "facets_stats", default)]
    pub facets_stats: HashMap<String, FacetStats>,
}

/// HTTP client for one Algolia application.
#[derive(Clone)]
pub struct AlgoliaClient {
    client: reqwest::Client,
    app_id: String,
    api_key: String,
    read_host: String,
    write_host: String,
}

impl AlgoliaClient {
    /// Create a client for the application's default hosts.
    pub fn new(client: reqwest::Client, app_id: &str, api_key: &str) -> Self {
        Self::with_hosts(
            client,
            app_id,
            api_key,
            format!("https://{app_id}-dsn.algolia.net"),
            format!("https://{app_id}.algolia.net"),
        )
    }

    /// Create a client pointing at explicit read and write hosts.
    pub fn with_hosts(
        client: reqwest::Client,
        app_id: &str,
        api_key: &str,
        read_host: String,
        write_host: String,
    ) -> Self {
        Self {
            client,
            app_id: app_id.to_string(),
            api_key: api_key.to_string(),
            read_host,
            write_host,
        }
    }

    /// Run a search against `index`.
    pub async fn search<T: DeserializeOwned>(
        &self,
        index: &str,
        request: &SearchRequest,
    ) -> Result<SearchResponse<T>, AlgoliaError> {
        let response = self
            .client
            .post(format!("{}/1/indexes/{index}/query", self.read_host))
            .header(APP_ID_HEADER, &self.app_id)
            .header(API_KEY_HEADER, &self.api_key)
            .json(request)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Add or replace the record with the given `object_id`.
    pub async fn save_object<T: Serialize>(
        &self,
        index: &str,
        object_id: &str,
        record: &T,
    ) -> Result<(), AlgoliaError> {
        let response = self
            .client
            .put(format!("{}/1/indexes/{index}/{object_id}", self.write_host))
            .header(APP_ID_HEADER, &self.app_id)
            .header(API_KEY_HEADER, &self.api_key)
            .json(record)
            .send()
            .await?;

        Self::check_status(response).await
    }

    /// Delete the record with the given `object_id`. Deleting a missing
    /// record succeeds.
    pub async fn delete_object(&self, index: &str, object_id: &str) -> Result<(), AlgoliaError> {
        let response = self
            .client
            .delete(format!("{}/1/indexes/{index}/{object_id}", self.write_host))
            .header(APP_ID_HEADER, &self.app_id)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        Self::check_status(response).await
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or an [`AlgoliaError::ApiError`]
    /// containing the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, AlgoliaError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(AlgoliaError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, AlgoliaError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    async fn check_status(response: reqwest::Response) -> Result<(), AlgoliaError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}
