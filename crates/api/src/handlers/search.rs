//! Handler for the job search endpoint.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use portal_core::search_params::RawSearchParams;

use crate::error::{AppError, AppResult};
use crate::job_search::{self, JobSearch};
use crate::middleware::rbac::RequireProviderOrAdmin;
use crate::state::AppState;

/// GET /api/jobs/search
///
/// Search open jobs. Served from the search index when it has matches,
/// otherwise from the primary store.
pub async fn search_jobs(
    RequireProviderOrAdmin(user): RequireProviderOrAdmin,
    State(state): State<AppState>,
    Query(raw): Query<RawSearchParams>,
) -> AppResult<impl IntoResponse> {
    let params = raw
        .parse()
        .map_err(|e| AppError::with_validation_message(e, "Invalid search parameters"))?;

    tracing::debug!(
        user_id = user.user_id,
        q = ?params.q,
        location = ?params.location,
        sort = params.sort_by.as_str(),
        page = params.page,
        "Job search requested"
    );

    let search = JobSearch {
        store: state.store.as_ref(),
        index: state.search_index.as_deref(),
        geocoder: state.geocoder.as_ref(),
    };
    let response = job_search::search_jobs(&search, &params).await?;

    Ok(Json(response))
}
