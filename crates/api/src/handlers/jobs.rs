//! Handlers for job documents.
//!
//! Every write publishes a document event so the search index follows the
//! primary store.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use portal_core::error::CoreError;
use portal_core::job::{DerivedLocation, Job, JobView, NewJob, UpdateJobStatus};
use portal_core::ports;
use portal_core::slug;
use portal_core::types::DbId;
use portal_events::DocumentEvent;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireCustomer;
use crate::response::DataResponse;
use crate::state::AppState;

/// Load a job or fail with 404.
pub(crate) async fn find_job_or_404(state: &AppState, job_id: DbId) -> AppResult<Job> {
    state
        .store
        .find_job(job_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Job",
            id: job_id,
        }))
}

/// Only the customer who posted a job (or an admin) may change it.
fn ensure_owner(user: &AuthUser, job: &Job) -> AppResult<()> {
    if user.is_admin() || job.customer_id == user.user_id {
        Ok(())
    } else {
        Err(AppError::Core(CoreError::Forbidden(
            "Only the job owner can modify this job".into(),
        )))
    }
}

/// Geocode a new job's postcode and pick its city slug so searches served
/// from the store can match it. Lookup failures leave the fields empty; the
/// index sync retries them on the next write.
async fn derive_location(state: &AppState, customer_id: DbId, input: &NewJob) -> DerivedLocation {
    let place = match ports::geocode_postcode(state.geocoder.as_ref(), &input.postcode).await {
        Ok(place) => place,
        Err(e) => {
            tracing::warn!(error = %e, postcode = %input.postcode, "Geocoding new job failed");
            None
        }
    };

    let owner = match state.store.find_user(customer_id).await {
        Ok(owner) => owner,
        Err(e) => {
            tracing::warn!(error = %e, customer_id, "Loading job owner failed");
            None
        }
    };
    let profile = owner.as_ref().map(|o| &o.profile);

    let city_slug = slug::first_slug([
        input.town.as_deref(),
        profile.and_then(|p| p.city_slug.as_deref()),
        profile.and_then(|p| p.location_name.as_deref()),
        place.as_ref().and_then(|p| p.admin_district.as_deref()),
    ]);

    DerivedLocation {
        coordinates: place.map(|p| p.point),
        city_slug,
    }
}

/// POST /api/jobs
pub async fn create_job(
    RequireCustomer(user): RequireCustomer,
    State(state): State<AppState>,
    Json(input): Json<NewJob>,
) -> AppResult<impl IntoResponse> {
    let input = input.normalized()?;
    let derived = derive_location(&state, user.user_id, &input).await;
    let job = state.store.create_job(user.user_id, &input, &derived).await?;

    state
        .event_bus
        .publish(DocumentEvent::job_written(job.id).with_actor(user.user_id));

    tracing::info!(
        job_id = job.id,
        user_id = user.user_id,
        urgency = job.urgency.as_str(),
        "Job created",
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: JobView::from(&job),
        }),
    ))
}

/// GET /api/jobs/{id}
pub async fn get_job(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = find_job_or_404(&state, job_id).await?;

    Ok(Json(DataResponse {
        data: JobView::from(&job),
    }))
}

/// PATCH /api/jobs/{id}/status
pub async fn update_job_status(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
    Json(input): Json<UpdateJobStatus>,
) -> AppResult<impl IntoResponse> {
    let job = find_job_or_404(&state, job_id).await?;
    ensure_owner(&auth, &job)?;

    let next = job.status.transition(input.status)?;
    let updated = state
        .store
        .update_job_status(job_id, next)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Job",
            id: job_id,
        }))?;

    state
        .event_bus
        .publish(DocumentEvent::job_written(job_id).with_actor(auth.user_id));

    tracing::info!(
        job_id,
        user_id = auth.user_id,
        from = job.status.as_str(),
        to = next.as_str(),
        "Job status changed",
    );

    Ok(Json(DataResponse {
        data: JobView::from(&updated),
    }))
}

/// DELETE /api/jobs/{id}
pub async fn delete_job(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = find_job_or_404(&state, job_id).await?;
    ensure_owner(&auth, &job)?;

    if !state.store.delete_job(job_id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Job",
            id: job_id,
        }));
    }

    state
        .event_bus
        .publish(DocumentEvent::job_deleted(job_id).with_actor(auth.user_id));

    tracing::info!(job_id, user_id = auth.user_id, "Job deleted");

    Ok(StatusCode::NO_CONTENT)
}
