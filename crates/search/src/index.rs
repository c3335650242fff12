//! [`AlgoliaIndex`]: the `SearchIndex` port over [`AlgoliaClient`].

use async_trait::async_trait;
use portal_core::error::CoreError;
use portal_core::fallback::round2;
use portal_core::geo::METERS_PER_MILE;
use portal_core::index_record::{JobRecord, TradespersonRecord};
use portal_core::ports::{IndexHit, IndexPage, JobIndexQuery, SearchIndex};
use portal_core::types::DbId;

use crate::client::{AlgoliaClient, AlgoliaConfig, AlgoliaError, SearchResponse};
use crate::query::{build_job_search, replica_for};

impl From<AlgoliaError> for CoreError {
    fn from(err: AlgoliaError) -> Self {
        CoreError::Upstream {
            service: "algolia",
            message: err.to_string(),
        }
    }
}

/// Jobs and tradespeople indices of one Algolia application.
#[derive(Clone)]
pub struct AlgoliaIndex {
    client: AlgoliaClient,
    jobs_index: String,
    users_index: String,
}

impl AlgoliaIndex {
    pub fn new(client: AlgoliaClient, jobs_index: String, users_index: String) -> Self {
        Self {
            client,
            jobs_index,
            users_index,
        }
    }

    pub fn from_config(http: reqwest::Client, config: &AlgoliaConfig) -> Self {
        Self::new(
            AlgoliaClient::new(http, &config.app_id, &config.api_key),
            config.jobs_index.clone(),
            config.users_index.clone(),
        )
    }
}

/// Turn a raw search response into an [`IndexPage`].
pub fn to_index_page(response: SearchResponse<JobRecord>) -> Result<IndexPage, CoreError> {
    let emergency_count = response
        .facets
        .get("urgency")
        .and_then(|counts| counts.get("emergency"))
        .copied()
        .unwrap_or(0);
    let average_budget = response
        .facets_stats
        .get("budget")
        .map(|stats| round2(stats.avg));

    let hits = response
        .hits
        .into_iter()
        .map(|hit| {
            let distance_miles = hit
                .ranking_info
                .and_then(|info| info.geo_distance)
                .map(|meters| meters / METERS_PER_MILE);
            Ok(IndexHit {
                job: hit.record.into_job()?,
                distance_miles,
            })
        })
        .collect::<Result<Vec<_>, CoreError>>()?;

    Ok(IndexPage {
        hits,
        total: response.nb_hits,
        emergency_count,
        average_budget,
    })
}

#[async_trait]
impl SearchIndex for AlgoliaIndex {
    async fn search_jobs(&self, query: &JobIndexQuery) -> Result<IndexPage, CoreError> {
        let index = replica_for(&self.jobs_index, query.sort);
        let request = build_job_search(query);

        tracing::debug!(
            index = %index,
            query = %request.query,
            facet_filters = ?request.facet_filters,
            numeric_filters = ?request.numeric_filters,
            page = request.page,
            "Querying search index",
        );

        let response = self
            .client
            .search::<JobRecord>(&index, &request)
            .await?;
        to_index_page(response)
    }

    async fn upsert_job(&self, record: &JobRecord) -> Result<(), CoreError> {
        self.client
            .save_object(&self.jobs_index, &record.object_id, record)
            .await?;
        Ok(())
    }

    async fn delete_job(&self, id: DbId) -> Result<(), CoreError> {
        self.client
            .delete_object(&self.jobs_index, &id.to_string())
            .await?;
        Ok(())
    }

    async fn upsert_tradesperson(&self, record: &TradespersonRecord) -> Result<(), CoreError> {
        self.client
            .save_object(&self.users_index, &record.object_id, record)
            .await?;
        Ok(())
    }

    async fn delete_tradesperson(&self, id: DbId) -> Result<(), CoreError> {
        self.client
            .delete_object(&self.users_index, &id.to_string())
            .await?;
        Ok(())
    }
}
