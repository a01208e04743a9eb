//! Current user endpoints.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use hasker_common::AppResult;
use hasker_core::UpdateProfileInput;
use hasker_db::entities::{user, user_profile};
use serde::Serialize;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Current user with private profile settings.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub id: String,
    pub username: String,
    pub avatar_url: Option<String>,
    pub email: Option<String>,
    pub send_email: bool,
    pub created_at: String,
}

impl From<(user::Model, user_profile::Model)> for MeResponse {
    fn from((user, profile): (user::Model, user_profile::Model)) -> Self {
        Self {
            id: user.id,
            username: user.username,
            avatar_url: user.avatar_url,
            email: profile.email,
            send_email: profile.send_email,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Get the current user.
async fn me(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<MeResponse>> {
    let me = state.user_service.get_with_profile(&user.id).await?;
    Ok(ApiResponse::ok(me.into()))
}

/// Update email, email alerts and avatar.
async fn update(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<UpdateProfileInput>,
) -> AppResult<ApiResponse<MeResponse>> {
    let me = state.user_service.update_profile(&user.id, input).await?;
    Ok(ApiResponse::ok(me.into()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(me))
        .route("/update", post(update))
}
