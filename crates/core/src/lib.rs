//! Core business logic for hasker-rs.
//!
//! The two central pieces are the vote ledger ([`VoteService`]) and the
//! best-answer state machine ([`BestAnswerService`]); the remaining services
//! cover questions, answers, tags, users and answer notifications.

pub mod services;

pub use services::*;
