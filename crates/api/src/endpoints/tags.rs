//! Tag endpoints.

use axum::{
    Router,
    extract::{Path, State},
    routing::get,
};
use hasker_common::AppResult;

use super::questions::QuestionResponse;
use crate::{extractors::MaybeAuthUser, middleware::AppState, response::ApiResponse};

/// Questions carrying a tag, newest first.
async fn questions(
    _user: MaybeAuthUser,
    State(state): State<AppState>,
    Path(title): Path<String>,
) -> AppResult<ApiResponse<Vec<QuestionResponse>>> {
    let list = state.question_service.by_tag(&title).await?;
    Ok(ApiResponse::ok(list.into_iter().map(Into::into).collect()))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/{title}", get(questions))
}
