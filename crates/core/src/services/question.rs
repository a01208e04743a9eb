//! Question service.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use hasker_common::{AppError, AppResult, IdGenerator, config::SiteConfig};
use hasker_db::{
    entities::{answer, question, tag, user, vote::VotableType},
    repositories::{AnswerRepository, QuestionRepository, UserRepository, VoteRepository},
};
use sea_orm::{DatabaseConnection, Set, TransactionTrait};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use crate::services::tag::{TagService, parse_tags};

/// Search prefix selecting questions by tag.
const TAG_SEARCH_PREFIX: &str = "tag:";

/// Input for asking a question.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionInput {
    #[validate(length(min = 1, max = 60))]
    pub title: String,

    #[validate(length(min = 1, max = 10000))]
    pub content: String,

    /// Whitespace-separated tag titles.
    #[validate(length(max = 60))]
    #[serde(default)]
    pub tags: String,
}

/// Question with its number of answers, for list views.
#[derive(Debug, Clone)]
pub struct QuestionSummary {
    pub question: question::Model,
    pub answers_count: u64,
}

/// Question page: the question, its tags, its answers and their authors.
#[derive(Debug, Clone)]
pub struct QuestionDetail {
    pub question: question::Model,
    pub tags: Vec<tag::Model>,
    /// Best answer first, then by score.
    pub answers: Vec<answer::Model>,
    /// Authors of the question and the answers, by user ID.
    pub users: HashMap<String, user::Model>,
}

/// Question service for business logic.
#[derive(Clone)]
pub struct QuestionService {
    db: Arc<DatabaseConnection>,
    question_repo: QuestionRepository,
    answer_repo: AnswerRepository,
    user_repo: UserRepository,
    tag_service: TagService,
    site: SiteConfig,
    id_gen: IdGenerator,
}

impl QuestionService {
    /// Create a new question service.
    #[must_use]
    pub const fn new(
        db: Arc<DatabaseConnection>,
        question_repo: QuestionRepository,
        answer_repo: AnswerRepository,
        user_repo: UserRepository,
        tag_service: TagService,
        site: SiteConfig,
    ) -> Self {
        Self {
            db,
            question_repo,
            answer_repo,
            user_repo,
            tag_service,
            site,
            id_gen: IdGenerator::new(),
        }
    }

    /// Ask a question. The question and its tags are written together.
    pub async fn create(
        &self,
        author_id: &str,
        input: CreateQuestionInput,
    ) -> AppResult<(question::Model, Vec<tag::Model>)> {
        input.validate()?;

        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::Validation("Title must not be blank".to_string()));
        }
        let tag_titles = parse_tags(&input.tags, self.site.max_tags_per_question)?;

        if self.question_repo.find_by_title(&title).await?.is_some() {
            return Err(AppError::Conflict(
                "A question with this title already exists".to_string(),
            ));
        }

        let model = question::ActiveModel {
            id: Set(self.id_gen.generate()),
            title: Set(title),
            author_id: Set(author_id.to_string()),
            content: Set(input.content),
            status: Set(question::STATUS_OPEN),
            score: Set(0),
            created_at: Set(Utc::now().into()),
        };

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let question = QuestionRepository::create_in(&txn, model).await?;
        let tags = self
            .tag_service
            .save_tags_in(&txn, &question.id, &tag_titles)
            .await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        info!(
            question_id = %question.id,
            author_id = %author_id,
            tags = tags.len(),
            "Question created"
        );

        Ok((question, tags))
    }

    /// Get a question with its tags, answers and authors.
    pub async fn detail(&self, id: &str) -> AppResult<QuestionDetail> {
        let question = self.question_repo.get_by_id(id).await?;
        let tags = self.tag_service.tags_of(id).await?;
        let answers = self.answer_repo.find_by_question(id).await?;

        let mut user_ids: Vec<String> = Vec::with_capacity(answers.len() + 1);
        user_ids.push(question.author_id.clone());
        for answer in &answers {
            if !user_ids.contains(&answer.author_id) {
                user_ids.push(answer.author_id.clone());
            }
        }
        let users = self
            .user_repo
            .find_by_ids(&user_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        Ok(QuestionDetail {
            question,
            tags,
            answers,
            users,
        })
    }

    /// Newest questions first.
    pub async fn newest(&self) -> AppResult<Vec<QuestionSummary>> {
        let questions = self.question_repo.find_newest(self.site.list_limit).await?;
        self.summarize(questions).await
    }

    /// Highest-scored questions first.
    pub async fn trending(&self) -> AppResult<Vec<QuestionSummary>> {
        let questions = self
            .question_repo
            .find_trending(self.site.trending_questions)
            .await?;
        self.summarize(questions).await
    }

    /// Questions carrying a tag. Unknown tags are `NotFound`.
    pub async fn by_tag(&self, title: &str) -> AppResult<Vec<QuestionSummary>> {
        let tag = self.tag_service.get_by_title(title).await?;
        let questions = self
            .question_repo
            .find_by_tag(&tag.id, self.site.list_limit)
            .await?;
        self.summarize(questions).await
    }

    /// Search titles and contents, or list a tag with `tag:<title>`.
    pub async fn search(&self, query: &str) -> AppResult<Vec<QuestionSummary>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::Validation("Search query is empty".to_string()));
        }

        if let Some(title) = query.strip_prefix(TAG_SEARCH_PREFIX) {
            return match self.by_tag(title.trim()).await {
                Err(AppError::NotFound(_)) => Ok(vec![]),
                result => result,
            };
        }

        let questions = self.question_repo.search(query, self.site.list_limit).await?;
        self.summarize(questions).await
    }

    /// Delete a question with its answers and every vote cast on them.
    ///
    /// Only the author may delete a question.
    pub async fn delete(&self, user_id: &str, id: &str) -> AppResult<()> {
        let question = self.question_repo.get_by_id(id).await?;
        if question.author_id != user_id {
            return Err(AppError::Forbidden(
                "You can only delete your own questions".to_string(),
            ));
        }

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let answer_ids = AnswerRepository::find_ids_by_question_in(&txn, id).await?;
        let answer_votes =
            VoteRepository::delete_for_votables_in(&txn, VotableType::Answer, &answer_ids).await?;
        let question_votes =
            VoteRepository::delete_for_votables_in(&txn, VotableType::Question, &[id.to_string()])
                .await?;
        QuestionRepository::delete_in(&txn, id).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        info!(
            question_id = %id,
            answers = answer_ids.len(),
            votes = answer_votes + question_votes,
            "Question deleted"
        );

        Ok(())
    }

    async fn summarize(&self, questions: Vec<question::Model>) -> AppResult<Vec<QuestionSummary>> {
        let ids: Vec<String> = questions.iter().map(|q| q.id.clone()).collect();
        let counts = self.answer_repo.count_by_questions(&ids).await?;

        Ok(questions
            .into_iter()
            .map(|question| QuestionSummary {
                answers_count: counts.get(&question.id).copied().unwrap_or(0),
                question,
            })
            .collect())
    }
}
