//! Worker pool for fire-and-forget moderation work.
//!
//! Warns and bulk discards are accepted immediately and processed in the
//! background by a bounded number of workers. Faults inside a job are
//! captured by the moderation service and never reach the caller.

use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info};
use validator::Validate;
use warden_common::{AppError, AppResult, FaultKind, ModerationConfig};

use crate::services::fault::FaultService;
use crate::services::moderation::{ModerationService, WarnInput};

const COMPONENT: &str = "jobs";

/// Default number of concurrent job workers.
pub const DEFAULT_WORKERS: usize = 4;

/// Default queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Work items accepted by the pool.
#[derive(Debug, Clone)]
pub enum ModerationJob {
    /// Record a warn and escalate if needed.
    Warn(WarnInput),
    /// Discard every warn of a subject.
    DiscardAll {
        subject_id: String,
        issuer_id: String,
    },
}

/// Job sender for enqueueing moderation work.
#[derive(Clone)]
pub struct JobSender {
    sender: mpsc::Sender<ModerationJob>,
}

impl JobSender {
    /// Enqueue a job without waiting. Fails if the queue is full or stopped.
    pub fn enqueue(&self, job: ModerationJob) -> AppResult<()> {
        self.sender.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                AppError::Queue("Moderation queue is full".to_string())
            }
            mpsc::error::TrySendError::Closed(_) => {
                AppError::Queue("Moderation queue is stopped".to_string())
            }
        })
    }

    /// Enqueue a warn. Invalid input is rejected before anything is queued.
    pub fn warn(&self, input: WarnInput) -> AppResult<()> {
        input.validate()?;
        self.enqueue(ModerationJob::Warn(input))
    }

    /// Enqueue discarding every warn of a subject.
    pub fn discard_all(&self, subject_id: &str, issuer_id: &str) -> AppResult<()> {
        self.enqueue(ModerationJob::DiscardAll {
            subject_id: subject_id.to_string(),
            issuer_id: issuer_id.to_string(),
        })
    }
}

/// Job processing service.
pub struct JobService {
    sender: mpsc::Sender<ModerationJob>,
    receiver: mpsc::Receiver<ModerationJob>,
    workers: usize,
}

impl JobService {
    /// Create a job service with the given queue capacity and worker count.
    #[must_use]
    pub fn new(capacity: usize, workers: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        Self {
            sender,
            receiver,
            workers: workers.max(1),
        }
    }

    /// Create a job service sized from configuration.
    #[must_use]
    pub fn from_config(config: &ModerationConfig) -> Self {
        Self::new(config.queue_capacity, config.workers)
    }

    /// Get a job sender for enqueueing jobs.
    #[must_use]
    pub fn sender(&self) -> JobSender {
        JobSender {
            sender: self.sender.clone(),
        }
    }

    /// Start processing jobs with the given moderation service.
    ///
    /// The returned task finishes once every sender is dropped and all
    /// queued and in-flight jobs are done.
    pub fn start(self, service: ModerationService) -> JoinHandle<()> {
        let Self {
            receiver, workers, ..
        } = self;

        tokio::spawn(async move {
            info!(workers, "Moderation job worker starting");
            run_job_processor(receiver, service, workers).await;
            info!("Moderation job worker stopped");
        })
    }
}

impl Default for JobService {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS)
    }
}

/// Run the job processor.
async fn run_job_processor(
    mut receiver: mpsc::Receiver<ModerationJob>,
    service: ModerationService,
    workers: usize,
) {
    let semaphore = Arc::new(Semaphore::new(workers));
    let faults = service.fault_reporter();
    let mut in_flight = JoinSet::new();

    while let Some(job) = receiver.recv().await {
        let Ok(permit) = semaphore.clone().acquire_owned().await else {
            break;
        };
        let service = service.clone();

        in_flight.spawn(async move {
            let _permit = permit;
            process_job(job, &service).await;
        });

        while let Some(result) = in_flight.try_join_next() {
            reap(result, &faults);
        }
    }

    while let Some(result) = in_flight.join_next().await {
        reap(result, &faults);
    }
}

fn reap(result: Result<(), tokio::task::JoinError>, faults: &FaultService) {
    if let Err(e) = result {
        faults.capture(COMPONENT, &AppError::Internal(e.to_string()));
    }
}

/// Process a single job.
async fn process_job(job: ModerationJob, service: &ModerationService) {
    let result = match job {
        ModerationJob::Warn(input) => {
            let subject_id = input.subject_id.clone();
            service.warn(input).await.map(|outcome| {
                debug!(
                    subject_id = %subject_id,
                    total_severity = outcome.severity.total_severity,
                    actions = outcome.events.len(),
                    "Warn job done"
                );
            })
        }
        ModerationJob::DiscardAll {
            subject_id,
            issuer_id,
        } => service.discard_all(&subject_id, &issuer_id).await,
    };

    match result {
        Ok(()) => {}
        // enqueued without going through JobSender::warn
        Err(e) if e.fault_kind() == FaultKind::Validation => {
            service.fault_reporter().capture(COMPONENT, &e);
        }
        Err(e) => debug!(error = %e, "Moderation job aborted"),
    }
}
