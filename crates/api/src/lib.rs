//! HTTP API layer for hasker-rs.
//!
//! - **Endpoints**: accounts, questions, answers, votes, best answers and tags
//! - **Extractors**: required and optional authentication
//! - **Middleware**: bearer token authentication and the shared [`AppState`]
//!
//! Built on Axum 0.8; mount [`router`] under `/api`.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
pub use middleware::AppState;
