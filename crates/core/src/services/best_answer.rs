//! Best-answer state machine.
//!
//! A question is either open (`status = 0`, no flagged answer) or answered
//! (`status = 1`, exactly one answer with `answer_flag = 1`). Each transition
//! locks the question row, then the answer rows it touches, and commits all
//! writes together.

use std::sync::Arc;

use hasker_common::{AppError, AppResult};
use hasker_db::{
    entities::{answer, question},
    repositories::{AnswerRepository, QuestionRepository},
};
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use serde::Serialize;
use tracing::{error, info};

/// Transition applied by [`BestAnswerService::toggle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FlagTransition {
    /// Flag an answer on an open question.
    SetNew,
    /// Move the flag from another answer to this one.
    Change,
    /// Clear the flag of this answer.
    Delete,
}

/// Pick the transition for toggling an answer, given whether it is flagged
/// and its question's status.
#[must_use]
pub const fn select_transition(answer_flagged: bool, question_status: i16) -> FlagTransition {
    if answer_flagged {
        FlagTransition::Delete
    } else if question_status == question::STATUS_OPEN {
        FlagTransition::SetNew
    } else {
        FlagTransition::Change
    }
}

/// Best-answer service.
#[derive(Clone)]
pub struct BestAnswerService {
    db: Arc<DatabaseConnection>,
    answer_repo: AnswerRepository,
}

impl BestAnswerService {
    /// Create a new best-answer service.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>, answer_repo: AnswerRepository) -> Self {
        Self { db, answer_repo }
    }

    /// Flag an answer of an open question and mark the question answered.
    pub async fn set_new_flag(&self, answer_id: &str) -> AppResult<()> {
        let txn = self.begin().await?;
        let (question, answer) = self.lock(&txn, answer_id).await?;
        apply_set_new(txn, &question, &answer).await
    }

    /// Move the flag from the currently flagged answer to this one. The
    /// question stays answered.
    pub async fn change_flag(&self, answer_id: &str) -> AppResult<()> {
        let txn = self.begin().await?;
        let (question, answer) = self.lock(&txn, answer_id).await?;
        apply_change(txn, &question, &answer).await
    }

    /// Clear the flag of the flagged answer and reopen the question.
    pub async fn delete_flag(&self, answer_id: &str) -> AppResult<()> {
        let txn = self.begin().await?;
        let (question, answer) = self.lock(&txn, answer_id).await?;
        apply_delete(txn, &question, &answer).await
    }

    /// Toggle the best-answer flag of an answer on behalf of `user_id`.
    ///
    /// Only the question's author may toggle, and never on their own answer.
    /// The transition is chosen from the locked rows, so a repeated or
    /// concurrent toggle sees the state left by the one before it.
    pub async fn toggle(&self, user_id: &str, answer_id: &str) -> AppResult<FlagTransition> {
        let txn = self.begin().await?;
        let (question, answer) = self.lock(&txn, answer_id).await?;

        if question.author_id != user_id {
            rollback(txn).await?;
            return Err(AppError::Forbidden(
                "Only the author of the question can choose the best answer".to_string(),
            ));
        }
        if answer.author_id == user_id {
            rollback(txn).await?;
            return Err(AppError::Forbidden(
                "You cannot choose your own answer as the best one".to_string(),
            ));
        }

        let transition = select_transition(answer.is_best(), question.status);
        match transition {
            FlagTransition::SetNew => apply_set_new(txn, &question, &answer).await?,
            FlagTransition::Change => apply_change(txn, &question, &answer).await?,
            FlagTransition::Delete => apply_delete(txn, &question, &answer).await?,
        }

        Ok(transition)
    }

    async fn begin(&self) -> AppResult<DatabaseTransaction> {
        self.db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Lock the answer's question, then the answer itself.
    async fn lock(
        &self,
        txn: &DatabaseTransaction,
        answer_id: &str,
    ) -> AppResult<(question::Model, answer::Model)> {
        // question_id never changes, so it can be read outside the lock
        let question_id = self.answer_repo.get_by_id(answer_id).await?.question_id;

        let question = QuestionRepository::find_for_update_in(txn, &question_id)
            .await?
            .ok_or(AppError::QuestionNotFound(question_id))?;
        let answer = AnswerRepository::find_for_update_in(txn, answer_id)
            .await?
            .ok_or_else(|| AppError::AnswerNotFound(answer_id.to_string()))?;

        Ok((question, answer))
    }
}

async fn apply_set_new(
    txn: DatabaseTransaction,
    question: &question::Model,
    answer: &answer::Model,
) -> AppResult<()> {
    if question.is_answered() || answer.is_best() {
        let message = format!(
            "set_new_flag on answer {}: question {} is already answered",
            answer.id, question.id
        );
        return Err(precondition(txn, &message).await);
    }

    AnswerRepository::set_flag_in(&txn, &answer.id, answer::FLAG_BEST).await?;
    QuestionRepository::set_status_in(&txn, &question.id, question::STATUS_ANSWERED).await?;
    commit(txn).await?;

    info!(question_id = %question.id, answer_id = %answer.id, "Best answer set");
    Ok(())
}

async fn apply_change(
    txn: DatabaseTransaction,
    question: &question::Model,
    answer: &answer::Model,
) -> AppResult<()> {
    if answer.is_best() {
        let message = format!(
            "change_flag on answer {}: answer is already the best one",
            answer.id
        );
        return Err(precondition(txn, &message).await);
    }

    let Some(previous) = AnswerRepository::find_best_for_update_in(&txn, &question.id).await?
    else {
        let message = format!(
            "change_flag on answer {}: question {} has no best answer",
            answer.id, question.id
        );
        return Err(precondition(txn, &message).await);
    };

    // Clear first: the database allows one flagged answer per question.
    AnswerRepository::set_flag_in(&txn, &previous.id, answer::FLAG_NONE).await?;
    AnswerRepository::set_flag_in(&txn, &answer.id, answer::FLAG_BEST).await?;
    commit(txn).await?;

    info!(
        question_id = %question.id,
        previous_answer_id = %previous.id,
        answer_id = %answer.id,
        "Best answer changed"
    );
    Ok(())
}

async fn apply_delete(
    txn: DatabaseTransaction,
    question: &question::Model,
    answer: &answer::Model,
) -> AppResult<()> {
    if !answer.is_best() {
        let message = format!(
            "delete_flag on answer {}: answer is not the best one",
            answer.id
        );
        return Err(precondition(txn, &message).await);
    }

    AnswerRepository::set_flag_in(&txn, &answer.id, answer::FLAG_NONE).await?;
    QuestionRepository::set_status_in(&txn, &question.id, question::STATUS_OPEN).await?;
    commit(txn).await?;

    info!(question_id = %question.id, answer_id = %answer.id, "Best answer cleared");
    Ok(())
}

async fn commit(txn: DatabaseTransaction) -> AppResult<()> {
    txn.commit()
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

async fn rollback(txn: DatabaseTransaction) -> AppResult<()> {
    txn.rollback()
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

/// Roll back and report a transition requested from the wrong state.
async fn precondition(txn: DatabaseTransaction, message: &str) -> AppError {
    error!(message = %message, "Best answer precondition violated");
    if let Err(e) = txn.rollback().await {
        return AppError::Database(e.to_string());
    }
    AppError::Precondition(message.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    fn create_test_question(status: i16) -> question::Model {
        question::Model {
            id: "q1".to_string(),
            title: "How do lifetimes work?".to_string(),
            author_id: "asker".to_string(),
            content: "content".to_string(),
            status,
            score: 0,
            created_at: Utc::now().into(),
        }
    }

    fn create_test_answer(id: &str, author_id: &str, flag: i16) -> answer::Model {
        answer::Model {
            id: id.to_string(),
            question_id: "q1".to_string(),
            author_id: author_id.to_string(),
            content: "content".to_string(),
            answer_flag: flag,
            score: 0,
            created_at: Utc::now().into(),
        }
    }

    fn into_log(db: Arc<DatabaseConnection>) -> String {
        match Arc::try_unwrap(db) {
            Ok(db) => format!("{:?}", db.into_transaction_log()),
            Err(_) => panic!("connection is still shared"),
        }
    }

    /// Answers repository returning the given rows in order.
    fn answers(rows: Vec<answer::Model>) -> DatabaseConnection {
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(rows.into_iter().map(|row| vec![row]))
            .into_connection()
    }

    fn create_test_service(
        txn_db: DatabaseConnection,
        answer_db: DatabaseConnection,
    ) -> (BestAnswerService, Arc<DatabaseConnection>) {
        let txn_db = Arc::new(txn_db);
        let service =
            BestAnswerService::new(Arc::clone(&txn_db), AnswerRepository::new(Arc::new(answer_db)));
        (service, txn_db)
    }

    #[test]
    fn test_select_transition() {
        assert_eq!(
            select_transition(true, question::STATUS_ANSWERED),
            FlagTransition::Delete
        );
        assert_eq!(
            select_transition(false, question::STATUS_OPEN),
            FlagTransition::SetNew
        );
        assert_eq!(
            select_transition(false, question::STATUS_ANSWERED),
            FlagTransition::Change
        );
    }

    #[tokio::test]
    async fn test_set_new_flag() {
        let txn_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_question(question::STATUS_OPEN)]])
            .append_query_results([[create_test_answer("a1", "helper", answer::FLAG_NONE)]])
            .append_exec_results([exec(1), exec(1)])
            .into_connection();
        let answer_db = answers(vec![create_test_answer("a1", "helper", answer::FLAG_NONE)]);
        let (service, txn_db) = create_test_service(txn_db, answer_db);

        service.set_new_flag("a1").await.unwrap();

        drop(service);
        let log = into_log(txn_db);
        assert!(log.contains(r#"UPDATE \"answer\" SET \"answer_flag\""#));
        assert!(log.contains(r#"UPDATE \"question\" SET \"status\""#));
        assert!(log.contains("COMMIT"));
    }

    #[tokio::test]
    async fn test_set_new_flag_on_answered_question_is_precondition_error() {
        let txn_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_question(question::STATUS_ANSWERED)]])
            .append_query_results([[create_test_answer("a1", "helper", answer::FLAG_NONE)]])
            .into_connection();
        let answer_db = answers(vec![create_test_answer("a1", "helper", answer::FLAG_NONE)]);
        let (service, txn_db) = create_test_service(txn_db, answer_db);

        let result = service.set_new_flag("a1").await;
        assert!(matches!(result, Err(AppError::Precondition(_))));

        drop(service);
        let log = into_log(txn_db);
        assert!(log.contains("ROLLBACK"));
        assert!(!log.contains("COMMIT"));
    }

    #[tokio::test]
    async fn test_change_flag_clears_previous_first() {
        let txn_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_question(question::STATUS_ANSWERED)]])
            .append_query_results([[create_test_answer("b", "helper", answer::FLAG_NONE)]])
            .append_query_results([[create_test_answer("a", "other", answer::FLAG_BEST)]])
            .append_exec_results([exec(1), exec(1)])
            .into_connection();
        let answer_db = answers(vec![create_test_answer("b", "helper", answer::FLAG_NONE)]);
        let (service, txn_db) = create_test_service(txn_db, answer_db);

        service.change_flag("b").await.unwrap();

        drop(service);
        let log = into_log(txn_db);
        let clear = log.find(r#"SmallInt(Some(0)), String(Some("a"))"#).unwrap();
        let set = log.find(r#"SmallInt(Some(1)), String(Some("b"))"#).unwrap();
        assert!(clear < set, "previous flag is cleared before the new one is set");
        assert!(!log.contains(r#"UPDATE \"question\""#));
        assert!(log.contains("COMMIT"));
    }

    #[tokio::test]
    async fn test_change_flag_without_flagged_answer_is_precondition_error() {
        let txn_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_question(question::STATUS_ANSWERED)]])
            .append_query_results([[create_test_answer("b", "helper", answer::FLAG_NONE)]])
            .append_query_results([Vec::<answer::Model>::new()])
            .into_connection();
        let answer_db = answers(vec![create_test_answer("b", "helper", answer::FLAG_NONE)]);
        let (service, txn_db) = create_test_service(txn_db, answer_db);

        let result = service.change_flag("b").await;
        assert!(matches!(result, Err(AppError::Precondition(msg)) if msg.contains("no best answer")));

        drop(service);
        let log = into_log(txn_db);
        assert!(!log.contains(r#"UPDATE \""#));
        assert!(log.contains("ROLLBACK"));
    }

    #[tokio::test]
    async fn test_delete_flag() {
        let txn_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_question(question::STATUS_ANSWERED)]])
            .append_query_results([[create_test_answer("a1", "helper", answer::FLAG_BEST)]])
            .append_exec_results([exec(1), exec(1)])
            .into_connection();
        let answer_db = answers(vec![create_test_answer("a1", "helper", answer::FLAG_BEST)]);
        let (service, txn_db) = create_test_service(txn_db, answer_db);

        service.delete_flag("a1").await.unwrap();

        drop(service);
        let log = into_log(txn_db);
        assert!(log.contains(r#"UPDATE \"question\" SET \"status\""#));
        assert!(log.contains("COMMIT"));
    }

    #[tokio::test]
    async fn test_delete_flag_on_unflagged_answer_is_precondition_error() {
        let txn_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_question(question::STATUS_OPEN)]])
            .append_query_results([[create_test_answer("a1", "helper", answer::FLAG_NONE)]])
            .into_connection();
        let answer_db = answers(vec![create_test_answer("a1", "helper", answer::FLAG_NONE)]);
        let (service, _) = create_test_service(txn_db, answer_db);

        let result = service.delete_flag("a1").await;

        assert!(matches!(result, Err(AppError::Precondition(_))));
    }

    /// Transaction connection that locks `question`, then `answer`.
    fn locked(question: question::Model, answer: answer::Model) -> MockDatabase {
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[question]])
            .append_query_results([[answer]])
    }

    #[tokio::test]
    async fn test_toggle_by_non_author_is_forbidden() {
        let open = create_test_answer("a1", "helper", answer::FLAG_NONE);
        let txn_db = locked(create_test_question(question::STATUS_OPEN), open.clone()).into_connection();
        let (service, txn_db) = create_test_service(txn_db, answers(vec![open]));

        let result = service.toggle("stranger", "a1").await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));

        drop(service);
        let log = into_log(txn_db);
        assert!(!log.contains(r#"UPDATE \""#));
        assert!(log.contains("ROLLBACK"));
    }

    #[tokio::test]
    async fn test_toggle_own_answer_is_forbidden() {
        let own = create_test_answer("a1", "asker", answer::FLAG_NONE);
        let txn_db = locked(create_test_question(question::STATUS_OPEN), own.clone()).into_connection();
        let (service, _) = create_test_service(txn_db, answers(vec![own]));

        let result = service.toggle("asker", "a1").await;

        assert!(matches!(result, Err(AppError::Forbidden(msg)) if msg.contains("own answer")));
    }

    #[tokio::test]
    async fn test_toggle_selects_delete_for_flagged_answer() {
        let flagged = create_test_answer("a1", "helper", answer::FLAG_BEST);
        let txn_db = locked(create_test_question(question::STATUS_ANSWERED), flagged.clone())
            .append_exec_results([exec(1), exec(1)])
            .into_connection();
        let (service, _) = create_test_service(txn_db, answers(vec![flagged]));

        let transition = service.toggle("asker", "a1").await.unwrap();

        assert_eq!(transition, FlagTransition::Delete);
    }

    #[tokio::test]
    async fn test_toggle_follows_state_committed_by_earlier_toggle() {
        // Another toggle flagged "a0" and committed while this one waited
        // for the question lock.
        let txn_db = locked(
            create_test_question(question::STATUS_ANSWERED),
            create_test_answer("a1", "helper", answer::FLAG_NONE),
        )
        .append_query_results([[create_test_answer("a0", "other", answer::FLAG_BEST)]])
        .append_exec_results([exec(1), exec(1)])
        .into_connection();
        let answer_db = answers(vec![create_test_answer("a1", "helper", answer::FLAG_NONE)]);
        let (service, txn_db) = create_test_service(txn_db, answer_db);

        let transition = service.toggle("asker", "a1").await.unwrap();
        assert_eq!(transition, FlagTransition::Change);

        drop(service);
        let log = into_log(txn_db);
        assert!(log.contains("COMMIT"));
        assert!(!log.contains("ROLLBACK"));
    }

    #[tokio::test]
    async fn test_toggle_twice_on_same_answer_clears_flag() {
        // The first click set the flag; the repeated click locks the
        // flagged answer and undoes it instead of failing.
        let txn_db = locked(
            create_test_question(question::STATUS_ANSWERED),
            create_test_answer("a1", "helper", answer::FLAG_BEST),
        )
        .append_exec_results([exec(1), exec(1)])
        .into_connection();
        let answer_db = answers(vec![create_test_answer("a1", "helper", answer::FLAG_NONE)]);
        let (service, _) = create_test_service(txn_db, answer_db);

        let transition = service.toggle("asker", "a1").await.unwrap();

        assert_eq!(transition, FlagTransition::Delete);
    }
}
