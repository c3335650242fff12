//! Route definitions for user profiles.

use axum::routing::patch;
use axum::Router;

use crate::handlers::users;
use crate::state::AppState;

/// User routes mounted at `/users`.
///
/// ```text
/// PATCH  /me                -> update_me
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/me", patch(users::update_me))
}
