//! API endpoints.

mod account;
mod answers;
mod auth;
mod questions;
mod tags;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .nest("/i", account::router())
        .nest("/questions", questions::router())
        .nest("/answers", answers::router())
        .nest("/tags", tags::router())
}
