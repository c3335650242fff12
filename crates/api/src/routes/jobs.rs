//! Route definitions for jobs and their quotes.

use axum::routing::{get, patch, post};
use axum::Router;

use crate::handlers::{jobs, quotes, search};
use crate::state::AppState;

/// Job routes mounted at `/jobs`.
///
/// ```text
/// POST   /                  -> create_job
/// GET    /search            -> search_jobs
/// GET    /{id}              -> get_job
/// DELETE /{id}              -> delete_job
/// PATCH  /{id}/status       -> update_job_status
/// POST   /{id}/quotes       -> create_quote
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(jobs::create_job))
        .route("/search", get(search::search_jobs))
        .route("/{id}", get(jobs::get_job).delete(jobs::delete_job))
        .route("/{id}/status", patch(jobs::update_job_status))
        .route("/{id}/quotes", post(quotes::create_quote))
}
