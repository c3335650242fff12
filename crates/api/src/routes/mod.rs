pub mod health;
pub mod jobs;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /jobs                        create (customer or admin)
/// /jobs/search                 search open jobs (provider or admin)
/// /jobs/{id}                   get, delete (owner or admin)
/// /jobs/{id}/status            change status (owner or admin)
/// /jobs/{id}/quotes            submit a quote (service provider)
///
/// /users/me                    update own profile
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/jobs", jobs::router())
        .nest("/users", users::router())
}
