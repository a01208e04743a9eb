//! Job processing service for background tasks.
//!
//! A simple in-memory job queue: request handlers enqueue jobs and return,
//! a worker pool sends the resulting emails.

use std::sync::Arc;

use hasker_common::{AppError, AppResult};
use hasker_db::repositories::{QuestionRepository, UserProfileRepository, UserRepository};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::services::email::EmailService;

/// Maximum number of concurrent job workers.
const MAX_WORKERS: usize = 4;

/// Channel buffer size for jobs.
const JOB_BUFFER_SIZE: usize = 1000;

/// Job types that can be processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    /// A question received an answer from someone other than its author.
    QuestionAnswered {
        question_id: String,
        answer_id: String,
    },
}

/// Job sender for enqueueing jobs.
#[derive(Clone)]
pub struct JobSender {
    sender: mpsc::Sender<Job>,
}

impl JobSender {
    /// Enqueue a job for processing.
    pub async fn enqueue(&self, job: Job) -> AppResult<()> {
        self.sender
            .send(job)
            .await
            .map_err(|_| AppError::Internal("Job queue is closed".to_string()))
    }

    /// Enqueue a question-answered notification.
    pub async fn question_answered(&self, question_id: String, answer_id: String) -> AppResult<()> {
        self.enqueue(Job::QuestionAnswered {
            question_id,
            answer_id,
        })
        .await
    }
}

/// Job worker context containing services needed for job processing.
#[derive(Clone)]
pub struct JobWorkerContext {
    pub question_repo: QuestionRepository,
    pub user_repo: UserRepository,
    pub profile_repo: UserProfileRepository,
    pub email: EmailService,
}

/// Job processing service.
pub struct JobService {
    sender: mpsc::Sender<Job>,
    receiver: mpsc::Receiver<Job>,
}

impl JobService {
    /// Create a new job service.
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel(JOB_BUFFER_SIZE);
        Self { sender, receiver }
    }

    /// Get a job sender for enqueueing jobs.
    #[must_use]
    pub fn sender(&self) -> JobSender {
        JobSender {
            sender: self.sender.clone(),
        }
    }

    /// Start the job processor with the given context.
    ///
    /// The returned task finishes once every [`JobSender`] is dropped and the
    /// jobs already taken from the queue are done.
    pub fn start(self, context: JobWorkerContext) -> JoinHandle<()> {
        let Self { sender, receiver } = self;
        drop(sender);
        let context = Arc::new(context);

        tokio::spawn(async move {
            info!("Job worker starting with {} workers", MAX_WORKERS);
            run_job_processor(receiver, context).await;
            info!("Job worker stopped");
        })
    }

    /// Take the queue's receiving end without starting workers.
    #[cfg(test)]
    pub(crate) fn into_receiver(self) -> mpsc::Receiver<Job> {
        self.receiver
    }
}

impl Default for JobService {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the job processor.
async fn run_job_processor(mut receiver: mpsc::Receiver<Job>, context: Arc<JobWorkerContext>) {
    // Use a semaphore to limit concurrent workers
    let semaphore = Arc::new(Semaphore::new(MAX_WORKERS));

    while let Some(job) = receiver.recv().await {
        let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
            break;
        };
        let ctx = Arc::clone(&context);

        tokio::spawn(async move {
            let _permit = permit;
            process_job(job, &ctx).await;
        });
    }

    // Wait for in-flight jobs
    let _ = semaphore.acquire_many(MAX_WORKERS as u32).await;
}

/// Process a single job.
async fn process_job(job: Job, context: &JobWorkerContext) {
    match job {
        Job::QuestionAnswered {
            question_id,
            answer_id,
        } => {
            if let Err(e) = process_question_answered(context, &question_id).await {
                error!(
                    question_id = %question_id,
                    answer_id = %answer_id,
                    error = %e,
                    "Failed to send question answered email"
                );
            }
        }
    }
}

/// Email the question's author if they opted in to alerts.
async fn process_question_answered(context: &JobWorkerContext, question_id: &str) -> AppResult<()> {
    if !context.email.is_enabled() {
        debug!("Email service not available, skipping notification");
        return Ok(());
    }

    let question = context.question_repo.get_by_id(question_id).await?;
    let author = context.user_repo.get_by_id(&question.author_id).await?;
    let profile = context.profile_repo.get_by_user_id(&author.id).await?;

    if !profile.send_email {
        debug!(user_id = %author.id, "Email alerts disabled, skipping notification");
        return Ok(());
    }
    let Some(email) = profile.email else {
        debug!(user_id = %author.id, "No email address, skipping notification");
        return Ok(());
    };

    let message = context.email.question_answered_message(
        &email,
        &author.username,
        &question.id,
        &question.title,
    );
    context.email.send(&message).await
}
