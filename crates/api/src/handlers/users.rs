//! Handlers for the signed-in user's own profile.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use portal_core::error::CoreError;
use portal_core::user::UpdateProfile;
use portal_events::DocumentEvent;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAuth;
use crate::response::DataResponse;
use crate::state::AppState;

/// PATCH /api/users/me
///
/// Update business name, specialties, location name and postcode. Absent
/// fields are left as they are; empty strings clear them.
pub async fn update_me(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Json(input): Json<UpdateProfile>,
) -> AppResult<impl IntoResponse> {
    let patch = input.normalized()?;

    let updated = state
        .store
        .update_profile(user.user_id, &patch)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: user.user_id,
        }))?;

    state
        .event_bus
        .publish(DocumentEvent::user_written(updated.id).with_actor(user.user_id));

    tracing::info!(
        user_id = user.user_id,
        specialties = updated.profile.specialties.len(),
        "Profile updated",
    );

    Ok(Json(DataResponse { data: updated }))
}
