//! API middleware.

#![allow(missing_docs)]

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use hasker_common::config::SiteConfig;
use hasker_core::{
    AnswerService, BestAnswerService, JobSender, QuestionService, TagService, UserService,
    VoteService,
};
use hasker_db::repositories::{
    AnswerRepository, QuestionRepository, TagRepository, UserProfileRepository, UserRepository,
};
use sea_orm::DatabaseConnection;
use tracing::debug;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub question_service: QuestionService,
    pub answer_service: AnswerService,
    pub vote_service: VoteService,
    pub best_answer_service: BestAnswerService,
}

impl AppState {
    /// Wire repositories and services over one connection pool.
    ///
    /// Without a job sender, answers are stored but nobody is notified.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>, site: SiteConfig, jobs: Option<JobSender>) -> Self {
        let user_repo = UserRepository::new(Arc::clone(&db));
        let profile_repo = UserProfileRepository::new(Arc::clone(&db));
        let question_repo = QuestionRepository::new(Arc::clone(&db));
        let answer_repo = AnswerRepository::new(Arc::clone(&db));
        let tag_repo = TagRepository::new(Arc::clone(&db));

        let tag_service = TagService::new(tag_repo);
        let mut answer_service = AnswerService::new(
            Arc::clone(&db),
            question_repo.clone(),
            answer_repo.clone(),
        );
        if let Some(jobs) = jobs {
            answer_service.set_job_sender(jobs);
        }

        Self {
            user_service: UserService::new(Arc::clone(&db), user_repo.clone(), profile_repo),
            question_service: QuestionService::new(
                Arc::clone(&db),
                question_repo.clone(),
                answer_repo.clone(),
                user_repo,
                tag_service,
                site,
            ),
            answer_service,
            vote_service: VoteService::new(
                Arc::clone(&db),
                question_repo,
                answer_repo.clone(),
            ),
            best_answer_service: BestAnswerService::new(db, answer_repo),
        }
    }
}

/// Authentication middleware.
///
/// Resolves `Authorization: Bearer <token>` to a user stored in the request
/// extensions. Unknown tokens leave the request anonymous.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_owned);

    if let Some(token) = token {
        match state.user_service.authenticate_by_token(&token).await {
            Ok(user) => {
                req.extensions_mut().insert(user);
            }
            Err(e) => debug!(error = %e, "Bearer token rejected"),
        }
    }

    next.run(req).await
}
