//! Question endpoints.

use std::collections::HashMap;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use hasker_common::AppResult;
use hasker_core::{
    CreateAnswerInput, CreateQuestionInput, QuestionDetail, QuestionSummary, VoteDirection,
    VoteOutcome,
};
use hasker_db::entities::{answer, question, user, vote::Votable};
use serde::{Deserialize, Serialize};

use crate::{
    extractors::{AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::{self, ApiResponse, UserResponse},
};

/// Question response.
#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResponse {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author_id: String,
    pub is_answered: bool,
    pub score: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answers_count: Option<u64>,
    pub created_at: String,
    pub created_ago: String,
}

impl From<question::Model> for QuestionResponse {
    fn from(question: question::Model) -> Self {
        let (created_at, created_ago) = response::created(question.created_at);
        Self {
            is_answered: question.is_answered(),
            id: question.id,
            title: question.title,
            content: question.content,
            author_id: question.author_id,
            score: question.score,
            answers_count: None,
            created_at,
            created_ago,
        }
    }
}

impl From<QuestionSummary> for QuestionResponse {
    fn from(summary: QuestionSummary) -> Self {
        Self {
            answers_count: Some(summary.answers_count),
            ..summary.question.into()
        }
    }
}

/// Answer response.
#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResponse {
    pub id: String,
    pub question_id: String,
    pub author_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<UserResponse>,
    pub content: String,
    pub is_best: bool,
    pub score: i32,
    pub created_at: String,
    pub created_ago: String,
}

impl From<answer::Model> for AnswerResponse {
    fn from(answer: answer::Model) -> Self {
        let (created_at, created_ago) = response::created(answer.created_at);
        Self {
            is_best: answer.is_best(),
            id: answer.id,
            question_id: answer.question_id,
            author_id: answer.author_id,
            author: None,
            content: answer.content,
            score: answer.score,
            created_at,
            created_ago,
        }
    }
}

/// Question page response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDetailResponse {
    #[serde(flatten)]
    pub question: QuestionResponse,
    pub author: Option<UserResponse>,
    pub tags: Vec<String>,
    pub answers: Vec<AnswerResponse>,
}

impl From<QuestionDetail> for QuestionDetailResponse {
    fn from(detail: QuestionDetail) -> Self {
        let QuestionDetail {
            question,
            tags,
            answers,
            users,
        } = detail;
        let author_of = |id: &str, users: &HashMap<String, user::Model>| {
            users.get(id).cloned().map(UserResponse::from)
        };

        let author = author_of(&question.author_id, &users);
        let answers: Vec<AnswerResponse> = answers
            .into_iter()
            .map(|answer| {
                let author = author_of(&answer.author_id, &users);
                AnswerResponse {
                    author,
                    ..answer.into()
                }
            })
            .collect();

        Self {
            question: QuestionResponse {
                answers_count: Some(answers.len() as u64),
                ..question.into()
            },
            author,
            tags: tags.into_iter().map(|t| t.title).collect(),
            answers,
        }
    }
}

/// Create question response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedQuestionResponse {
    #[serde(flatten)]
    pub question: QuestionResponse,
    pub tags: Vec<String>,
}

/// Search query.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Vote request.
#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub direction: VoteDirection,
}

fn summaries(list: Vec<QuestionSummary>) -> Vec<QuestionResponse> {
    list.into_iter().map(Into::into).collect()
}

/// Newest questions.
async fn newest(
    _user: MaybeAuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<QuestionResponse>>> {
    let list = state.question_service.newest().await?;
    Ok(ApiResponse::ok(summaries(list)))
}

/// Highest-scored questions.
async fn trending(
    _user: MaybeAuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<QuestionResponse>>> {
    let list = state.question_service.trending().await?;
    Ok(ApiResponse::ok(summaries(list)))
}

/// Search questions; `tag:<title>` lists a tag.
async fn search(
    _user: MaybeAuthUser,
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<ApiResponse<Vec<QuestionResponse>>> {
    let list = state.question_service.search(&query.q).await?;
    Ok(ApiResponse::ok(summaries(list)))
}

/// Ask a question.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateQuestionInput>,
) -> AppResult<ApiResponse<CreatedQuestionResponse>> {
    let (question, tags) = state.question_service.create(&user.id, input).await?;

    Ok(ApiResponse::ok(CreatedQuestionResponse {
        question: question.into(),
        tags: tags.into_iter().map(|t| t.title).collect(),
    }))
}

/// Get a question with its tags and answers.
async fn show(
    _user: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<QuestionDetailResponse>> {
    let detail = state.question_service.detail(&id).await?;
    Ok(ApiResponse::ok(detail.into()))
}

/// Delete a question (author only).
async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl axum::response::IntoResponse> {
    state.question_service.delete(&user.id, &id).await?;
    Ok(response::ok())
}

/// Answer a question.
async fn answer(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<CreateAnswerInput>,
) -> AppResult<ApiResponse<AnswerResponse>> {
    let answer = state.answer_service.create(&user.id, &id, input).await?;
    Ok(ApiResponse::ok(AnswerResponse {
        author: Some(user.into()),
        ..answer.into()
    }))
}

/// Vote on a question.
async fn vote(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<VoteRequest>,
) -> AppResult<ApiResponse<VoteOutcome>> {
    let outcome = state
        .vote_service
        .vote(&Votable::Question(id), &user.id, req.direction)
        .await?;
    Ok(ApiResponse::ok(outcome))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(newest).post(create))
        .route("/trending", get(trending))
        .route("/search", get(search))
        .route("/{id}", get(show).delete(delete))
        .route("/{id}/answers", post(answer))
        .route("/{id}/vote", post(vote))
}
