//! Vote ledger entity: one row per (votable, voter).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of entity a vote row points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum VotableType {
    #[sea_orm(string_value = "question")]
    Question,
    #[sea_orm(string_value = "answer")]
    Answer,
}

impl VotableType {
    /// Lowercase name, as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Question => "question",
            Self::Answer => "answer",
        }
    }
}

/// Reference to something that can be voted on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Votable {
    /// A question, by ID.
    Question(String),
    /// An answer, by ID.
    Answer(String),
}

impl Votable {
    /// Discriminant stored in `vote.votable_type`.
    #[must_use]
    pub const fn kind(&self) -> VotableType {
        match self {
            Self::Question(_) => VotableType::Question,
            Self::Answer(_) => VotableType::Answer,
        }
    }

    /// ID of the question or answer.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Question(id) | Self::Answer(id) => id,
        }
    }
}

impl std::fmt::Display for Votable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind().as_str(), self.id())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vote")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub votable_type: VotableType,

    /// Question or answer ID; no foreign key since the target table varies
    pub votable_id: String,

    #[sea_orm(indexed)]
    pub voter_id: String,

    /// Current vote: -1, 0 or 1
    pub vote: i16,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::VoterId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Voter,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Voter.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_votable_accessors() {
        let q = Votable::Question("q1".to_string());
        let a = Votable::Answer("a1".to_string());

        assert_eq!(q.kind(), VotableType::Question);
        assert_eq!(a.kind(), VotableType::Answer);
        assert_eq!(q.id(), "q1");
        assert_eq!(a.id(), "a1");
        assert_eq!(q.to_string(), "question:q1");
        assert_eq!(a.kind().as_str(), "answer");
    }

    #[test]
    fn test_same_id_different_kind_differs() {
        assert_ne!(
            Votable::Question("x".to_string()),
            Votable::Answer("x".to_string())
        );
    }
}
