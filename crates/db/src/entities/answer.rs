//! Answer entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Regular answer.
pub const FLAG_NONE: i16 = 0;
/// Answer chosen as the best one by the question's author.
pub const FLAG_BEST: i16 = 1;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "answer")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub question_id: String,

    #[sea_orm(indexed)]
    pub author_id: String,

    #[sea_orm(column_type = "Text")]
    pub content: String,

    /// At most one answer per question is `FLAG_BEST`
    #[sea_orm(default_value = 0)]
    pub answer_flag: i16,

    /// Running sum of votes (denormalized)
    #[sea_orm(default_value = 0)]
    pub score: i32,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// Whether this answer carries the best-answer flag.
    #[must_use]
    pub const fn is_best(&self) -> bool {
        self.answer_flag == FLAG_BEST
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::question::Entity",
        from = "Column::QuestionId",
        to = "super::question::Column::Id",
        on_delete = "Cascade"
    )]
    Question,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AuthorId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Author,
}

impl Related<super::question::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Question.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
