//! Database entities.

pub mod answer;
pub mod question;
pub mod question_tag;
pub mod tag;
pub mod user;
pub mod user_profile;
pub mod vote;

pub use answer::Entity as Answer;
pub use question::Entity as Question;
pub use question_tag::Entity as QuestionTag;
pub use tag::Entity as Tag;
pub use user::Entity as User;
pub use user_profile::Entity as UserProfile;
pub use vote::Entity as Vote;
