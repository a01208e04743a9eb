//! Question repository.

use std::sync::Arc;

use crate::entities::{Question, question, question_tag};
use hasker_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait,
    sea_query::{Expr, Func, JoinType},
};

/// Question repository for database operations.
#[derive(Clone)]
pub struct QuestionRepository {
    db: Arc<DatabaseConnection>,
}

impl QuestionRepository {
    /// Create a new question repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a question by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<question::Model>> {
        Question::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a question by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<question::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::QuestionNotFound(id.to_string()))
    }

    /// Find a question by ID and lock the row until the surrounding
    /// transaction ends.
    pub async fn find_for_update_in<C: ConnectionTrait>(
        conn: &C,
        id: &str,
    ) -> AppResult<Option<question::Model>> {
        Question::find_by_id(id)
            .lock_exclusive()
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a question by its exact title.
    pub async fn find_by_title(&self, title: &str) -> AppResult<Option<question::Model>> {
        Question::find()
            .filter(question::Column::Title.eq(title))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get newest questions.
    pub async fn find_newest(&self, limit: u64) -> AppResult<Vec<question::Model>> {
        Question::find()
            .order_by_desc(question::Column::CreatedAt)
            .order_by_desc(question::Column::Id)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get top-scored questions.
    pub async fn find_trending(&self, limit: u64) -> AppResult<Vec<question::Model>> {
        Question::find()
            .order_by_desc(question::Column::Score)
            .order_by_desc(question::Column::CreatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Search questions whose title or content contains `query`
    /// (case-insensitive).
    pub async fn search(&self, query: &str, limit: u64) -> AppResult<Vec<question::Model>> {
        let pattern = format!(
            "%{}%",
            query
                .to_lowercase()
                .replace('%', "\\%")
                .replace('_', "\\_")
        );

        Question::find()
            .filter(
                Condition::any()
                    .add(
                        Expr::expr(Func::lower(Expr::col(question::Column::Title)))
                            .like(&pattern),
                    )
                    .add(
                        Expr::expr(Func::lower(Expr::col(question::Column::Content)))
                            .like(&pattern),
                    ),
            )
            .order_by_desc(question::Column::Score)
            .order_by_desc(question::Column::CreatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get questions carrying a tag, newest first.
    pub async fn find_by_tag(&self, tag_id: &str, limit: u64) -> AppResult<Vec<question::Model>> {
        Question::find()
            .join(JoinType::InnerJoin, question::Relation::QuestionTags.def())
            .filter(question_tag::Column::TagId.eq(tag_id))
            .order_by_desc(question::Column::CreatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a question.
    pub async fn create_in<C: ConnectionTrait>(
        conn: &C,
        model: question::ActiveModel,
    ) -> AppResult<question::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Atomically add `delta` to the score (single UPDATE, no fetch).
    ///
    /// Returns the number of updated rows.
    pub async fn adjust_score_in<C: ConnectionTrait>(
        conn: &C,
        id: &str,
        delta: i32,
    ) -> AppResult<u64> {
        let result = Question::update_many()
            .col_expr(
                question::Column::Score,
                Expr::col(question::Column::Score).add(delta),
            )
            .filter(question::Column::Id.eq(id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Set the best-answer status.
    pub async fn set_status_in<C: ConnectionTrait>(
        conn: &C,
        id: &str,
        status: i16,
    ) -> AppResult<u64> {
        let result = Question::update_many()
            .col_expr(question::Column::Status, Expr::value(status))
            .filter(question::Column::Id.eq(id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Delete a question. Answers and tag links cascade.
    pub async fn delete_in<C: ConnectionTrait>(conn: &C, id: &str) -> AppResult<u64> {
        let result = Question::delete_by_id(id)
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }
}
