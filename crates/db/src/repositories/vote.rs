//! Vote ledger repository.

use std::sync::Arc;

use crate::entities::vote::{Votable, VotableType};
use crate::entities::{Vote, vote};
use hasker_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect,
    Set,
    sea_query::{Expr, OnConflict},
};

/// Repository for per-(votable, voter) vote rows.
#[derive(Clone)]
pub struct VoteRepository {
    db: Arc<DatabaseConnection>,
}

impl VoteRepository {
    /// Create a new vote repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the vote row of a voter on a votable.
    pub async fn find(&self, votable: &Votable, voter_id: &str) -> AppResult<Option<vote::Model>> {
        Vote::find()
            .filter(vote::Column::VotableType.eq(votable.kind()))
            .filter(vote::Column::VotableId.eq(votable.id()))
            .filter(vote::Column::VoterId.eq(voter_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the vote row of a voter on a votable and lock it until the
    /// surrounding transaction ends (`SELECT ... FOR UPDATE`).
    pub async fn find_for_update_in<C: ConnectionTrait>(
        conn: &C,
        votable: &Votable,
        voter_id: &str,
    ) -> AppResult<Option<vote::Model>> {
        Vote::find()
            .filter(vote::Column::VotableType.eq(votable.kind()))
            .filter(vote::Column::VotableId.eq(votable.id()))
            .filter(vote::Column::VoterId.eq(voter_id))
            .lock_exclusive()
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get all vote rows of a votable.
    pub async fn find_by_votable(&self, votable: &Votable) -> AppResult<Vec<vote::Model>> {
        Vote::find()
            .filter(vote::Column::VotableType.eq(votable.kind()))
            .filter(vote::Column::VotableId.eq(votable.id()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Sum of all votes cast on a votable.
    ///
    /// Only used to audit the denormalized score; the score itself is
    /// maintained incrementally.
    pub async fn sum_for_votable(&self, votable: &Votable) -> AppResult<i64> {
        let sum = Vote::find()
            .select_only()
            .column_as(Expr::col(vote::Column::Vote).sum(), "total")
            .filter(vote::Column::VotableType.eq(votable.kind()))
            .filter(vote::Column::VotableId.eq(votable.id()))
            .into_tuple::<Option<i64>>()
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(sum.flatten().unwrap_or(0))
    }

    /// Insert the first vote row of a voter on a votable.
    ///
    /// Returns the number of inserted rows: `0` means a concurrent request
    /// created the row first.
    pub async fn insert_in<C: ConnectionTrait>(
        conn: &C,
        id: String,
        votable: &Votable,
        voter_id: &str,
        value: i16,
    ) -> AppResult<u64> {
        let model = vote::ActiveModel {
            id: Set(id),
            votable_type: Set(votable.kind()),
            votable_id: Set(votable.id().to_string()),
            voter_id: Set(voter_id.to_string()),
            vote: Set(value),
            created_at: Set(chrono::Utc::now().into()),
            updated_at: Set(None),
        };

        Vote::insert(model)
            .on_conflict(
                OnConflict::columns([
                    vote::Column::VotableType,
                    vote::Column::VotableId,
                    vote::Column::VoterId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Overwrite the value of an existing vote row.
    pub async fn set_value_in<C: ConnectionTrait>(
        conn: &C,
        id: &str,
        value: i16,
    ) -> AppResult<u64> {
        let result = Vote::update_many()
            .col_expr(vote::Column::Vote, Expr::value(value))
            .col_expr(vote::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
            .filter(vote::Column::Id.eq(id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Delete the vote rows of the given votables.
    ///
    /// `votable_id` has no foreign key, so deleting a question or an answer
    /// calls this in the same transaction.
    pub async fn delete_for_votables_in<C: ConnectionTrait>(
        conn: &C,
        kind: VotableType,
        votable_ids: &[String],
    ) -> AppResult<u64> {
        if votable_ids.is_empty() {
            return Ok(0);
        }

        let result = Vote::delete_many()
            .filter(vote::Column::VotableType.eq(kind))
            .filter(vote::Column::VotableId.is_in(votable_ids.to_vec()))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }
}
