//! Answer repository.

use std::collections::HashMap;
use std::sync::Arc;

use crate::entities::{Answer, answer};
use hasker_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, sea_query::Expr,
};

/// Answer repository for database operations.
#[derive(Clone)]
pub struct AnswerRepository {
    db: Arc<DatabaseConnection>,
}

impl AnswerRepository {
    /// Create a new answer repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an answer by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<answer::Model>> {
        Answer::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find an answer by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<answer::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::AnswerNotFound(id.to_string()))
    }

    /// Find an answer by ID and lock the row until the surrounding
    /// transaction ends.
    pub async fn find_for_update_in<C: ConnectionTrait>(
        conn: &C,
        id: &str,
    ) -> AppResult<Option<answer::Model>> {
        Answer::find_by_id(id)
            .lock_exclusive()
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the flagged answer of a question and lock it.
    pub async fn find_best_for_update_in<C: ConnectionTrait>(
        conn: &C,
        question_id: &str,
    ) -> AppResult<Option<answer::Model>> {
        Answer::find()
            .filter(answer::Column::QuestionId.eq(question_id))
            .filter(answer::Column::AnswerFlag.eq(answer::FLAG_BEST))
            .lock_exclusive()
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get the answers of a question: the best one first, then by score.
    pub async fn find_by_question(&self, question_id: &str) -> AppResult<Vec<answer::Model>> {
        Answer::find()
            .filter(answer::Column::QuestionId.eq(question_id))
            .order_by_desc(answer::Column::AnswerFlag)
            .order_by_desc(answer::Column::Score)
            .order_by_asc(answer::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get the IDs of all answers of a question.
    pub async fn find_ids_by_question_in<C: ConnectionTrait>(
        conn: &C,
        question_id: &str,
    ) -> AppResult<Vec<String>> {
        Answer::find()
            .select_only()
            .column(answer::Column::Id)
            .filter(answer::Column::QuestionId.eq(question_id))
            .into_tuple::<String>()
            .all(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count answers per question. Questions without answers are absent
    /// from the map.
    pub async fn count_by_questions(
        &self,
        question_ids: &[String],
    ) -> AppResult<HashMap<String, u64>> {
        if question_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = Answer::find()
            .select_only()
            .column(answer::Column::QuestionId)
            .column_as(Expr::col(answer::Column::Id).count(), "count")
            .filter(answer::Column::QuestionId.is_in(question_ids.to_vec()))
            .group_by(answer::Column::QuestionId)
            .into_tuple::<(String, i64)>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(question_id, count)| (question_id, count.max(0) as u64))
            .collect())
    }

    /// Create a new answer.
    pub async fn create(&self, model: answer::ActiveModel) -> AppResult<answer::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Set the best-answer flag.
    pub async fn set_flag_in<C: ConnectionTrait>(conn: &C, id: &str, flag: i16) -> AppResult<u64> {
        let result = Answer::update_many()
            .col_expr(answer::Column::AnswerFlag, Expr::value(flag))
            .filter(answer::Column::Id.eq(id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Atomically add `delta` to the score (single UPDATE, no fetch).
    pub async fn adjust_score_in<C: ConnectionTrait>(
        conn: &C,
        id: &str,
        delta: i32,
    ) -> AppResult<u64> {
        let result = Answer::update_many()
            .col_expr(answer::Column::Score, Expr::col(answer::Column::Score).add(delta))
            .filter(answer::Column::Id.eq(id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Delete an answer.
    pub async fn delete_in<C: ConnectionTrait>(conn: &C, id: &str) -> AppResult<u64> {
        let result = Answer::delete_by_id(id)
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }
}
