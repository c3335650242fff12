//! Handler for submitting quotes against a job.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use portal_core::error::CoreError;
use portal_core::job::JobStatus;
use portal_core::quote::NewQuote;
use portal_core::tier;
use portal_core::types::DbId;
use portal_events::DocumentEvent;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::handlers::jobs::find_job_or_404;
use crate::middleware::rbac::RequireServiceProvider;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/jobs/{id}/quotes
///
/// The job must still be accepting quotes, the provider may quote once per
/// job, and the provider's effective tier caps their pending quotes.
pub async fn create_quote(
    RequireServiceProvider(user): RequireServiceProvider,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
    Json(input): Json<NewQuote>,
) -> AppResult<impl IntoResponse> {
    input.validate().map_err(CoreError::from)?;

    let job = find_job_or_404(&state, job_id).await?;
    if !matches!(job.status, JobStatus::Open | JobStatus::Quoted) {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Job is {} and no longer accepting quotes",
            job.status.as_str()
        ))));
    }

    if state.store.has_quoted(job_id, user.user_id).await? {
        return Err(AppError::Core(CoreError::Conflict(
            "You have already quoted for this job".into(),
        )));
    }

    let provider = state
        .store
        .find_user(user.user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: user.user_id,
        }))?;
    let effective = provider.effective_tier();
    let pending = state.store.count_pending_quotes(user.user_id).await?;
    tier::check_quote_allowance(effective, pending)?;

    let quote = state.store.create_quote(job_id, user.user_id, &input).await?;

    state
        .event_bus
        .publish(DocumentEvent::job_written(job_id).with_actor(user.user_id));

    tracing::info!(
        quote_id = quote.id,
        job_id,
        user_id = user.user_id,
        tier = effective.as_str(),
        pending = pending + 1,
        "Quote submitted",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: quote })))
}
