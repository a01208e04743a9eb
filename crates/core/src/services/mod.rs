//! Business logic services.

#![allow(missing_docs)]

pub mod answer;
pub mod best_answer;
pub mod email;
pub mod jobs;
pub mod question;
pub mod tag;
pub mod user;
pub mod vote;

pub use answer::{AnswerService, CreateAnswerInput};
pub use best_answer::{BestAnswerService, FlagTransition, select_transition};
pub use email::{EmailMessage, EmailService, LogMailTransport, MailTransport, SmtpMailTransport};
pub use jobs::{Job, JobSender, JobService, JobWorkerContext};
pub use question::{CreateQuestionInput, QuestionDetail, QuestionService, QuestionSummary};
pub use tag::{MAX_TAG_LENGTH, TagService, parse_tags};
pub use user::{SignupInput, UpdateProfileInput, UserService};
pub use vote::{VoteDirection, VoteOutcome, VoteService, next_vote};
