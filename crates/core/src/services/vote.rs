//! Vote ledger service.
//!
//! Every voter holds a vote of -1, 0 or +1 on each question and answer. A
//! vote in one direction moves the holder one step that way, so undoing an
//! upvote takes one downvote and a real downvote takes a second one. The
//! votable's `score` moves by the same step in the same transaction.

use std::sync::Arc;

use hasker_common::{AppError, AppResult, IdGenerator};
use hasker_db::{
    entities::vote::Votable,
    repositories::{AnswerRepository, QuestionRepository, VoteRepository},
};
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Direction of a vote request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

impl std::fmt::Display for VoteDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Up => write!(f, "up"),
            Self::Down => write!(f, "down"),
        }
    }
}

/// Vote value after applying `direction` to `current`, or `None` when the
/// vote already sits at the limit in that direction.
#[must_use]
pub const fn next_vote(current: i16, direction: VoteDirection) -> Option<i16> {
    match direction {
        VoteDirection::Up if current < 1 => Some(current + 1),
        VoteDirection::Down if current > -1 => Some(current - 1),
        _ => None,
    }
}

/// Result of a vote request as seen by the voter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoteOutcome {
    /// Whether the vote changed anything.
    pub changed: bool,
    /// Score of the votable after the request.
    pub score: i32,
}

/// Vote ledger service.
#[derive(Clone)]
pub struct VoteService {
    db: Arc<DatabaseConnection>,
    question_repo: QuestionRepository,
    answer_repo: AnswerRepository,
    id_gen: IdGenerator,
}

impl VoteService {
    /// Create a new vote service.
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
            id_gen: IdGenerator::new(),
        }
    }

    /// Apply one vote step for `voter_id` on `votable`.
    ///
    /// Returns `false` without writing anything when the voter's vote is
    /// already at the limit in `direction`. Otherwise the vote row and the
    /// votable's score are updated in one transaction and `true` is returned.
    ///
    /// No authorization happens here; see [`VoteService::vote`].
    pub async fn register_vote(
        &self,
        votable: &Votable,
        voter_id: &str,
        direction: VoteDirection,
    ) -> AppResult<bool> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let existing = VoteRepository::find_for_update_in(&txn, votable, voter_id).await?;
        let mut current = existing.as_ref().map_or(0, |row| row.vote);

        let Some(mut next) = next_vote(current, direction) else {
            return Self::unchanged(txn, votable, voter_id, direction).await;
        };

        match existing {
            Some(row) => {
                VoteRepository::set_value_in(&txn, &row.id, next).await?;
            }
            None => {
                let inserted = VoteRepository::insert_in(
                    &txn,
                    self.id_gen.generate(),
                    votable,
                    voter_id,
                    next,
                )
                .await?;

                if inserted == 0 {
                    // A concurrent first vote by this voter committed its row
                    // while the insert waited; step from that row instead.
                    debug!(%votable, voter_id = %voter_id, "Lost first-vote race, re-reading vote");
                    let row = VoteRepository::find_for_update_in(&txn, votable, voter_id)
                        .await?
                        .ok_or_else(|| {
                            AppError::Database(format!(
                                "Vote of {voter_id} on {votable} conflicted but is missing"
                            ))
                        })?;

                    current = row.vote;
                    next = match next_vote(current, direction) {
                        Some(next) => next,
                        None => return Self::unchanged(txn, votable, voter_id, direction).await,
                    };
                    VoteRepository::set_value_in(&txn, &row.id, next).await?;
                }
            }
        }

        Self::adjust_score(&txn, votable, i32::from(next - current)).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        info!(%votable, voter_id = %voter_id, %direction, vote = next, "Vote registered");

        Ok(true)
    }

    /// Vote on behalf of a user: rejects votes on the user's own question or
    /// answer, applies [`VoteService::register_vote`] and reports the fresh
    /// score.
    pub async fn vote(
        &self,
        votable: &Votable,
        voter_id: &str,
        direction: VoteDirection,
    ) -> AppResult<VoteOutcome> {
        if self.author_of(votable).await? == voter_id {
            return Err(AppError::Forbidden(format!(
                "You cannot vote on your own {}",
                votable.kind().as_str()
            )));
        }

        let changed = self.register_vote(votable, voter_id, direction).await?;
        let score = self.score_of(votable).await?;

        Ok(VoteOutcome { changed, score })
    }

    async fn unchanged(
        txn: DatabaseTransaction,
        votable: &Votable,
        voter_id: &str,
        direction: VoteDirection,
    ) -> AppResult<bool> {
        txn.rollback()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        debug!(%votable, voter_id = %voter_id, %direction, "Vote already at limit");
        Ok(false)
    }

    async fn adjust_score(txn: &DatabaseTransaction, votable: &Votable, delta: i32) -> AppResult<()> {
        let updated = match votable {
            Votable::Question(id) => QuestionRepository::adjust_score_in(txn, id, delta).await?,
            Votable::Answer(id) => AnswerRepository::adjust_score_in(txn, id, delta).await?,
        };

        if updated == 0 {
            // The vote row written above is discarded with the transaction.
            return Err(not_found(votable));
        }

        Ok(())
    }

    async fn author_of(&self, votable: &Votable) -> AppResult<String> {
        Ok(match votable {
            Votable::Question(id) => self.question_repo.get_by_id(id).await?.author_id,
            Votable::Answer(id) => self.answer_repo.get_by_id(id).await?.author_id,
        })
    }

    async fn score_of(&self, votable: &Votable) -> AppResult<i32> {
        Ok(match votable {
            Votable::Question(id) => self.question_repo.get_by_id(id).await?.score,
            Votable::Answer(id) => self.answer_repo.get_by_id(id).await?.score,
        })
    }
}

fn not_found(votable: &Votable) -> AppError {
    match votable {
        Votable::Question(id) => AppError::QuestionNotFound(id.clone()),
        Votable::Answer(id) => AppError::AnswerNotFound(id.clone()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hasker_db::entities::{answer, question, vote};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    fn create_test_question(id: &str, author_id: &str, score: i32) -> question::Model {
        question::Model {
            id: id.to_string(),
            title: format!("Question {id}"),
            author_id: author_id.to_string(),
            content: "content".to_string(),
            status: question::STATUS_OPEN,
            score,
            created_at: Utc::now().into(),
        }
    }

    fn create_test_answer(id: &str, author_id: &str, score: i32) -> answer::Model {
        answer::Model {
            id: id.to_string(),
            question_id: "q1".to_string(),
            author_id: author_id.to_string(),
            content: "content".to_string(),
            answer_flag: answer::FLAG_NONE,
            score,
            created_at: Utc::now().into(),
        }
    }

    fn create_test_vote(votable: &Votable, voter_id: &str, value: i16) -> vote::Model {
        vote::Model {
            id: "v1".to_string(),
            votable_type: votable.kind(),
            votable_id: votable.id().to_string(),
            voter_id: voter_id.to_string(),
            vote: value,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_test_service(
        ledger_db: DatabaseConnection,
        question_db: DatabaseConnection,
        answer_db: DatabaseConnection,
    ) -> (VoteService, Arc<DatabaseConnection>) {
        let ledger_db = Arc::new(ledger_db);
        let service = VoteService::new(
            Arc::clone(&ledger_db),
            QuestionRepository::new(Arc::new(question_db)),
            AnswerRepository::new(Arc::new(answer_db)),
        );
        (service, ledger_db)
    }

    fn into_log(db: Arc<DatabaseConnection>) -> String {
        match Arc::try_unwrap(db) {
            Ok(db) => format!("{:?}", db.into_transaction_log()),
            Err(_) => panic!("connection is still shared"),
        }
    }

    fn empty_db() -> DatabaseConnection {
        MockDatabase::new(DatabaseBackend::Postgres).into_connection()
    }

    /// Replays a sequence of votes by one voter against the pure transition.
    fn replay(directions: &[VoteDirection]) -> Vec<(bool, i16, i32)> {
        let mut vote = 0;
        let mut score = 0;
        directions
            .iter()
            .map(|&direction| match next_vote(vote, direction) {
                Some(next) => {
                    score += i32::from(next - vote);
                    vote = next;
                    (true, vote, score)
                }
                None => (false, vote, score),
            })
            .collect()
    }

    #[test]
    fn test_next_vote_transitions() {
        use VoteDirection::{Down, Up};

        assert_eq!(next_vote(0, Up), Some(1));
        assert_eq!(next_vote(-1, Up), Some(0));
        assert_eq!(next_vote(1, Up), None);
        assert_eq!(next_vote(0, Down), Some(-1));
        assert_eq!(next_vote(1, Down), Some(0));
        assert_eq!(next_vote(-1, Down), None);
    }

    #[test]
    fn test_cancel_then_flip_sequence() {
        use VoteDirection::{Down, Up};

        let steps = replay(&[Up, Down, Down, Up, Up]);

        let votes: Vec<i16> = steps.iter().map(|s| s.1).collect();
        let scores: Vec<i32> = steps.iter().map(|s| s.2).collect();
        assert_eq!(votes, vec![1, 0, -1, 0, 1]);
        assert_eq!(scores, vec![1, 0, -1, 0, 1]);
        assert!(steps.iter().all(|s| s.0));
    }

    #[test]
    fn test_repeated_direction_is_noop() {
        use VoteDirection::{Down, Up};

        let steps = replay(&[Up, Up, Down, Down, Down]);

        assert_eq!(
            steps,
            vec![
                (true, 1, 1),
                (false, 1, 1),
                (true, 0, 0),
                (true, -1, -1),
                (false, -1, -1),
            ]
        );
    }

    #[test]
    fn test_score_contribution_matches_vote() {
        use VoteDirection::{Down, Up};

        let sequences: [&[VoteDirection]; 4] = [
            &[Up],
            &[Down, Down, Up],
            &[Up, Up, Up, Down, Down, Down, Down],
            &[Down, Up, Up, Down],
        ];

        for directions in sequences {
            let (_, vote, score) = *replay(directions).last().unwrap();
            assert_eq!(i32::from(vote), score);
        }
    }

    #[test]
    fn test_direction_deserializes_lowercase() {
        let up: VoteDirection = serde_json::from_str("\"up\"").unwrap();
        let down: VoteDirection = serde_json::from_str("\"down\"").unwrap();
        assert_eq!(up, VoteDirection::Up);
        assert_eq!(down, VoteDirection::Down);
        assert!(serde_json::from_str::<VoteDirection>("\"sideways\"").is_err());
    }

    #[tokio::test]
    async fn test_register_first_upvote_inserts_row_and_bumps_score() {
        let ledger_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<vote::Model>::new()])
            .append_exec_results([exec(1), exec(1)])
            .into_connection();
        let (service, ledger_db) = create_test_service(ledger_db, empty_db(), empty_db());

        let changed = service
            .register_vote(&Votable::Question("q1".to_string()), "voter", VoteDirection::Up)
            .await
            .unwrap();
        assert!(changed);

        drop(service);
        let log = into_log(ledger_db);
        assert!(log.contains("FOR UPDATE"));
        assert!(log.contains(r#"INSERT INTO \"vote\""#));
        assert!(log.contains(r#"UPDATE \"question\""#));
        assert!(log.contains("COMMIT"));
    }

    #[tokio::test]
    async fn test_register_same_direction_twice_is_noop() {
        let votable = Votable::Answer("a1".to_string());
        let ledger_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_vote(&votable, "voter", 1)]])
            .into_connection();
        let (service, ledger_db) = create_test_service(ledger_db, empty_db(), empty_db());

        let changed = service
            .register_vote(&votable, "voter", VoteDirection::Up)
            .await
            .unwrap();
        assert!(!changed);

        drop(service);
        let log = into_log(ledger_db);
        assert!(!log.contains(r#"UPDATE \""#));
        assert!(!log.contains("INSERT"));
    }

    #[tokio::test]
    async fn test_register_downvote_cancels_upvote() {
        let votable = Votable::Answer("a1".to_string());
        let ledger_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_vote(&votable, "voter", 1)]])
            .append_exec_results([exec(1), exec(1)])
            .into_connection();
        let (service, ledger_db) = create_test_service(ledger_db, empty_db(), empty_db());

        let changed = service
            .register_vote(&votable, "voter", VoteDirection::Down)
            .await
            .unwrap();
        assert!(changed);

        drop(service);
        let log = into_log(ledger_db);
        assert!(log.contains(r#"UPDATE \"vote\""#));
        assert!(log.contains(r#"UPDATE \"answer\""#));
        assert!(!log.contains("INSERT"));
    }

    #[tokio::test]
    async fn test_register_repeated_first_upvote_after_lost_insert_is_noop() {
        let votable = Votable::Question("q1".to_string());
        let ledger_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<vote::Model>::new()])
            .append_exec_results([exec(0)])
            .append_query_results([[create_test_vote(&votable, "voter", 1)]])
            .into_connection();
        let (service, ledger_db) = create_test_service(ledger_db, empty_db(), empty_db());

        let changed = service
            .register_vote(&votable, "voter", VoteDirection::Up)
            .await
            .unwrap();
        assert!(!changed);

        drop(service);
        let log = into_log(ledger_db);
        assert!(!log.contains(r#"UPDATE \""#));
        assert!(log.contains("ROLLBACK"));
    }

    #[tokio::test]
    async fn test_register_steps_from_row_committed_during_insert() {
        // The other request upvoted first; this downvote cancels it.
        let votable = Votable::Question("q1".to_string());
        let ledger_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<vote::Model>::new()])
            .append_exec_results([exec(0)])
            .append_query_results([[create_test_vote(&votable, "voter", 1)]])
            .append_exec_results([exec(1), exec(1)])
            .into_connection();
        let (service, ledger_db) = create_test_service(ledger_db, empty_db(), empty_db());

        let changed = service
            .register_vote(&votable, "voter", VoteDirection::Down)
            .await
            .unwrap();
        assert!(changed);

        drop(service);
        let log = into_log(ledger_db);
        assert!(log.contains(r#"UPDATE \"vote\""#));
        assert!(log.contains("SmallInt(Some(0))"), "vote steps from 1 to 0");
        let score_update = log.find(r#"UPDATE \"question\""#).unwrap();
        assert!(log[score_update..].contains("Int(Some(-1))"), "score drops by one");
        assert!(log.contains("COMMIT"));
    }

    #[tokio::test]
    async fn test_register_missing_votable_rolls_back() {
        let ledger_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<vote::Model>::new()])
            .append_exec_results([exec(1), exec(0)])
            .into_connection();
        let (service, ledger_db) = create_test_service(ledger_db, empty_db(), empty_db());

        let result = service
            .register_vote(&Votable::Answer("gone".to_string()), "voter", VoteDirection::Up)
            .await;
        assert!(matches!(result, Err(AppError::AnswerNotFound(id)) if id == "gone"));

        drop(service);
        let log = into_log(ledger_db);
        assert!(!log.contains("COMMIT"));
    }

    #[tokio::test]
    async fn test_vote_on_own_question_is_forbidden() {
        let question_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_question("q1", "author", 0)]])
            .into_connection();
        let (service, ledger_db) = create_test_service(empty_db(), question_db, empty_db());

        let result = service
            .vote(&Votable::Question("q1".to_string()), "author", VoteDirection::Up)
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));

        drop(service);
        assert_eq!(into_log(ledger_db), "[]", "ledger must not be touched");
    }

    #[tokio::test]
    async fn test_vote_reports_fresh_score() {
        let answer_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                [create_test_answer("a1", "author", 0)],
                [create_test_answer("a1", "author", 1)],
            ])
            .into_connection();
        let ledger_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<vote::Model>::new()])
            .append_exec_results([exec(1), exec(1)])
            .into_connection();
        let (service, _) = create_test_service(ledger_db, empty_db(), answer_db);

        let outcome = service
            .vote(&Votable::Answer("a1".to_string()), "voter", VoteDirection::Up)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            VoteOutcome {
                changed: true,
                score: 1
            }
        );
    }

    #[tokio::test]
    async fn test_vote_on_missing_answer() {
        let answer_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<answer::Model>::new()])
            .into_connection();
        let (service, _) = create_test_service(empty_db(), empty_db(), answer_db);

        let result = service
            .vote(&Votable::Answer("missing".to_string()), "voter", VoteDirection::Up)
            .await;

        assert!(matches!(result, Err(AppError::AnswerNotFound(_))));
    }
}
