//! Answer service.

use std::sync::Arc;

use chrono::Utc;
use hasker_common::{AppError, AppResult, IdGenerator};
use hasker_db::{
    entities::{answer, question, vote::VotableType},
    repositories::{AnswerRepository, QuestionRepository, VoteRepository},
};
use sea_orm::{DatabaseConnection, Set, TransactionTrait};
use serde::Deserialize;
use tracing::{info, warn};
use validator::Validate;

use crate::services::jobs::JobSender;

/// Input for answering a question.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAnswerInput {
    #[validate(length(min = 1, max = 10000))]
    pub content: String,
}

/// Answer service for business logic.
#[derive(Clone)]
pub struct AnswerService {
    db: Arc<DatabaseConnection>,
    question_repo: QuestionRepository,
    answer_repo: AnswerRepository,
    jobs: Option<JobSender>,
    id_gen: IdGenerator,
}

impl AnswerService {
    /// Create a new answer service.
    #[must_use]
    pub const fn new(
        db: Arc<DatabaseConnection>,
        question_repo: QuestionRepository,
        answer_repo: AnswerRepository,
    ) -> Self {
        Self {
            db,
            question_repo,
            answer_repo,
            jobs: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the job sender used for answer notifications.
    pub fn set_job_sender(&mut self, jobs: JobSender) {
        self.jobs = Some(jobs);
    }

    /// Answer a question.
    ///
    /// Unless the author answers their own question, a notification job is
    /// queued for the question's author. Queue failures are logged only.
    pub async fn create(
        &self,
        author_id: &str,
        question_id: &str,
        input: CreateAnswerInput,
    ) -> AppResult<answer::Model> {
        input.validate()?;

        if input.content.trim().is_empty() {
            return Err(AppError::Validation("Answer must not be blank".to_string()));
        }

        let question = self.question_repo.get_by_id(question_id).await?;

        let model = answer::ActiveModel {
            id: Set(self.id_gen.generate()),
            question_id: Set(question.id.clone()),
            author_id: Set(author_id.to_string()),
            content: Set(input.content),
            answer_flag: Set(answer::FLAG_NONE),
            score: Set(0),
            created_at: Set(Utc::now().into()),
        };
        let created = self.answer_repo.create(model).await?;

        info!(
            answer_id = %created.id,
            question_id = %question.id,
            author_id = %author_id,
            "Answer created"
        );

        if question.author_id != author_id {
            if let Some(ref jobs) = self.jobs {
                if let Err(e) = jobs
                    .question_answered(question.id.clone(), created.id.clone())
                    .await
                {
                    warn!(question_id = %question.id, error = %e, "Failed to queue answer notification");
                }
            }
        }

        Ok(created)
    }

    /// Delete an answer and the votes cast on it.
    ///
    /// Only the author may delete an answer. Deleting the best answer
    /// reopens its question.
    pub async fn delete(&self, user_id: &str, id: &str) -> AppResult<()> {
        let answer = self.answer_repo.get_by_id(id).await?;
        if answer.author_id != user_id {
            return Err(AppError::Forbidden(
                "You can only delete your own answers".to_string(),
            ));
        }

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        // Same lock order as the best-answer transitions
        QuestionRepository::find_for_update_in(&txn, &answer.question_id)
            .await?
            .ok_or_else(|| AppError::QuestionNotFound(answer.question_id.clone()))?;
        let answer = AnswerRepository::find_for_update_in(&txn, id)
            .await?
            .ok_or_else(|| AppError::AnswerNotFound(id.to_string()))?;

        VoteRepository::delete_for_votables_in(&txn, VotableType::Answer, &[id.to_string()])
            .await?;
        AnswerRepository::delete_in(&txn, id).await?;

        if answer.is_best() {
            QuestionRepository::set_status_in(&txn, &answer.question_id, question::STATUS_OPEN)
                .await?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        info!(
            answer_id = %id,
            question_id = %answer.question_id,
            was_best = answer.is_best(),
            "Answer deleted"
        );

        Ok(())
    }
}
