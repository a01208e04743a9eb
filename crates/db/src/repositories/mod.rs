//! Repository layer.
//!
//! Methods suffixed with `_in` take any [`sea_orm::ConnectionTrait`] so they can
//! run inside a caller-owned transaction; the plain variants use the pool.

pub mod answer;
pub mod question;
pub mod tag;
pub mod user;
pub mod user_profile;
pub mod vote;

pub use answer::AnswerRepository;
pub use question::QuestionRepository;
pub use tag::TagRepository;
pub use user::UserRepository;
pub use user_profile::UserProfileRepository;
pub use vote::VoteRepository;
