//! Answer endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{delete, post},
};
use hasker_common::AppResult;
use hasker_core::{FlagTransition, VoteOutcome};
use hasker_db::entities::vote::Votable;
use serde::Serialize;

use super::questions::VoteRequest;
use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{self, ApiResponse},
};

/// Best-answer toggle response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagResponse {
    pub answer_id: String,
    pub transition: FlagTransition,
}

/// Delete an answer (author only).
async fn remove(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.answer_service.delete(&user.id, &id).await?;
    Ok(response::ok())
}

/// Vote on an answer.
async fn vote(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<VoteRequest>,
) -> AppResult<ApiResponse<VoteOutcome>> {
    let outcome = state
        .vote_service
        .vote(&Votable::Answer(id), &user.id, req.direction)
        .await?;
    Ok(ApiResponse::ok(outcome))
}

/// Mark, move or clear the best answer of a question.
async fn flag(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<FlagResponse>> {
    let transition = state.best_answer_service.toggle(&user.id, &id).await?;
    Ok(ApiResponse::ok(FlagResponse {
        answer_id: id,
        transition,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", delete(remove))
        .route("/{id}/vote", post(vote))
        .route("/{id}/flag", post(flag))
}
