//! Tag repository.

use std::sync::Arc;

use crate::entities::{QuestionTag, Tag, question_tag, tag};
use hasker_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, RelationTrait, Set,
    sea_query::{JoinType, OnConflict},
};

/// Tag repository for database operations.
#[derive(Clone)]
pub struct TagRepository {
    db: Arc<DatabaseConnection>,
}

impl TagRepository {
    /// Create a new tag repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a tag by its exact title.
    pub async fn find_by_title(&self, title: &str) -> AppResult<Option<tag::Model>> {
        Tag::find()
            .filter(tag::Column::Title.eq(title))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find tags by exact titles.
    pub async fn find_by_titles_in<C: ConnectionTrait>(
        conn: &C,
        titles: &[String],
    ) -> AppResult<Vec<tag::Model>> {
        if titles.is_empty() {
            return Ok(vec![]);
        }

        Tag::find()
            .filter(tag::Column::Title.is_in(titles.to_vec()))
            .all(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get the tags of a question, alphabetically.
    pub async fn find_by_question(&self, question_id: &str) -> AppResult<Vec<tag::Model>> {
        Tag::find()
            .join(JoinType::InnerJoin, tag::Relation::QuestionTags.def())
            .filter(question_tag::Column::QuestionId.eq(question_id))
            .order_by_asc(tag::Column::Title)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a tag unless one with the same title exists.
    pub async fn insert_if_missing_in<C: ConnectionTrait>(
        conn: &C,
        id: String,
        title: &str,
    ) -> AppResult<u64> {
        let model = tag::ActiveModel {
            id: Set(id),
            title: Set(title.to_string()),
        };

        Tag::insert(model)
            .on_conflict(
                OnConflict::column(tag::Column::Title)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Link tags to a question. Existing links are kept.
    pub async fn link_in<C: ConnectionTrait>(
        conn: &C,
        question_id: &str,
        tag_ids: &[String],
    ) -> AppResult<u64> {
        if tag_ids.is_empty() {
            return Ok(0);
        }

        let links = tag_ids.iter().map(|tag_id| question_tag::ActiveModel {
            question_id: Set(question_id.to_string()),
            tag_id: Set(tag_id.clone()),
        });

        QuestionTag::insert_many(links)
            .on_conflict(
                OnConflict::columns([question_tag::Column::QuestionId, question_tag::Column::TagId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
