//! Job lifecycle: `Submitted -> Polling -> Succeeded | Failed | TimedOut`,
//! plus `Cancelled` when the poll timer is stopped.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::watch;
use tokio::time::{Instant, sleep, sleep_until};
use tracing::{info, warn};

use crate::{
    config::PollPolicy,
    error::{AppError, AppResult},
    hunyuan::{JobQuery, JobStatus, ReconstructionApi},
};

#[derive(Debug, Clone)]
pub enum JobPhase {
    Submitted { job_id: String },
    /// `attempts` queries have been answered with a running status.
    Polling { job_id: String, attempts: u32 },
    Succeeded { job_id: String, query: JobQuery },
    Failed { job_id: String, details: Value },
    TimedOut { job_id: String, attempts: u32 },
    Cancelled { job_id: String },
}

impl JobPhase {
    pub fn job_id(&self) -> &str {
        match self {
            JobPhase::Submitted { job_id }
            | JobPhase::Polling { job_id, .. }
            | JobPhase::Succeeded { job_id, .. }
            | JobPhase::Failed { job_id, .. }
            | JobPhase::TimedOut { job_id, .. }
            | JobPhase::Cancelled { job_id } => job_id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobPhase::Submitted { .. } | JobPhase::Polling { .. })
    }

    /// Phase after the `attempts`-th status query returned `query`.
    pub fn after_query(job_id: String, attempts: u32, query: JobQuery) -> JobPhase {
        match query.status {
            JobStatus::Running => JobPhase::Polling { job_id, attempts },
            JobStatus::Succeeded => JobPhase::Succeeded { job_id, query },
            JobStatus::Failed => JobPhase::Failed {
                job_id,
                details: query.raw,
            },
        }
    }

    /// Turns a terminal phase into the workflow result.
    pub fn into_result(self) -> AppResult<(String, JobQuery)> {
        match self {
            JobPhase::Succeeded { job_id, query } => Ok((job_id, query)),
            JobPhase::Failed { details, .. } => Err(AppError::upstream("Job failed", details)),
            JobPhase::TimedOut { job_id, attempts } => Err(AppError::Timeout { job_id, attempts }),
            JobPhase::Cancelled { job_id } => Err(AppError::Cancelled { job_id }),
            JobPhase::Submitted { job_id } | JobPhase::Polling { job_id, .. } => {
                Err(AppError::Transport(format!("job {job_id} has not finished")))
            }
        }
    }
}

/// Stops every poll timer created from it.
#[derive(Clone, Debug)]
pub struct CancelHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelHandle {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    pub fn timer(&self, interval: Duration) -> PollTimer {
        PollTimer {
            interval,
            cancelled: self.sender.subscribe(),
        }
    }
}

pub struct PollTimer {
    interval: Duration,
    cancelled: watch::Receiver<bool>,
}

impl PollTimer {
    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow()
    }

    /// Waits one interval. Returns `false` if cancelled before or during
    /// the wait.
    pub async fn tick(&mut self) -> bool {
        if self.is_cancelled() {
            return false;
        }
        let deadline = Instant::now() + self.interval;
        tokio::select! {
            _ = sleep(self.interval) => true,
            changed = self.cancelled.changed() => match changed {
                Ok(()) if *self.cancelled.borrow() => false,
                _ => {
                    sleep_until(deadline).await;
                    !self.is_cancelled()
                }
            },
        }
    }
}

/// Submits the image and drives the job to a terminal phase.
pub async fn run_job<A: ReconstructionApi>(
    api: &A,
    image_base64: &str,
    policy: &PollPolicy,
    cancel: &CancelHandle,
) -> AppResult<JobPhase> {
    let job_id = api.submit_job(image_base64).await?;
    drive_job(api, JobPhase::Submitted { job_id }, policy, cancel).await
}

/// Steps `phase` until it is terminal. Queries are spaced by the policy
/// interval; there is no wait before the first query or after the last.
pub async fn drive_job<A: ReconstructionApi>(
    api: &A,
    mut phase: JobPhase,
    policy: &PollPolicy,
    cancel: &CancelHandle,
) -> AppResult<JobPhase> {
    let mut timer = cancel.timer(policy.interval);
    loop {
        if phase.is_terminal() {
            info!(job_id = phase.job_id(), "reconstruction job settled");
            return Ok(phase);
        }
        phase = match phase {
            JobPhase::Submitted { job_id } => JobPhase::Polling {
                job_id,
                attempts: 0,
            },
            JobPhase::Polling { job_id, attempts } if attempts >= policy.max_attempts => {
                warn!(%job_id, attempts, "reconstruction job timed out");
                JobPhase::TimedOut { job_id, attempts }
            }
            JobPhase::Polling { job_id, attempts } => {
                let waited = if attempts == 0 {
                    !timer.is_cancelled()
                } else {
                    timer.tick().await
                };
                if !waited {
                    info!(%job_id, attempts, "reconstruction polling cancelled");
                    JobPhase::Cancelled { job_id }
                } else {
                    let query = api.query_job(&job_id).await?;
                    info!(
                        %job_id,
                        attempt = attempts + 1,
                        status = query.raw_status.as_deref().unwrap_or("<none>"),
                        "polled reconstruction job"
                    );
                    JobPhase::after_query(job_id, attempts + 1, query)
                }
            }
            terminal => terminal,
        };
    }
}
