//! Question entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// No answer has been marked as the best one.
pub const STATUS_OPEN: i16 = 0;
/// Exactly one answer carries the best-answer flag.
pub const STATUS_ANSWERED: i16 = 1;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "question")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(unique)]
    pub title: String,

    #[sea_orm(indexed)]
    pub author_id: String,

    #[sea_orm(column_type = "Text")]
    pub content: String,

    /// `STATUS_ANSWERED` iff one of the answers is flagged as best
    #[sea_orm(default_value = 0)]
    pub status: i16,

    /// Running sum of votes (denormalized)
    #[sea_orm(default_value = 0)]
    pub score: i32,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// Whether a best answer has been chosen.
    #[must_use]
    pub const fn is_answered(&self) -> bool {
        self.status == STATUS_ANSWERED
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AuthorId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Author,

    #[sea_orm(has_many = "super::answer::Entity")]
    Answers,

    #[sea_orm(has_many = "super::question_tag::Entity")]
    QuestionTags,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl Related<super::answer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Answers.def()
    }
}

impl Related<super::tag::Entity> for Entity {
    fn to() -> RelationDef {
        super::question_tag::Relation::Tag.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::question_tag::Relation::Question.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
