// bistro/src/jobs/runner.rs

//! The background job runner.
//!
//! A single tokio task polls the job store, claims due jobs and executes each
//! claimed job in its own task, so one slow handler never holds back unrelated
//! jobs. The claim (`pending -> locked`) is the only coordination point between
//! runner instances. A lock older than `RunnerConfig::lock_timeout` is treated
//! as abandoned (crashed runner, shutdown past its grace period, lost outcome
//! write) and the job becomes claimable again, so every job runs at least once.

use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn, Instrument};
use uuid::Uuid;

use crate::error::BistroResult;
use crate::jobs::model::{JobState, ScheduledJob};
use crate::jobs::reconcile::Reconciler;
use crate::jobs::registry::JobRegistry;
use crate::store::JobStore;

#[derive(Debug, Clone)]
pub struct RunnerConfig {
  /// Recorded as `locked_by` on claimed jobs.
  pub worker_id: String,
  pub poll_interval: Duration,
  /// Maximum number of due jobs fetched per poll.
  pub batch_size: usize,
  /// Period of the reconciliation sweep. Zero disables it.
  pub reconcile_interval: Duration,
  /// How long shutdown waits for in-flight handlers before abandoning them.
  pub shutdown_grace: Duration,
  /// A job `locked` for longer than this is considered abandoned and may be
  /// claimed again. Keep it above the slowest handler's run time.
  pub lock_timeout: Duration,
}

impl Default for RunnerConfig {
  fn default() -> Self {
    Self {
      worker_id: format!("runner-{}", Uuid::new_v4().simple()),
      poll_interval: Duration::from_secs(5),
      batch_size: 16,
      reconcile_interval: Duration::from_secs(300),
      shutdown_grace: Duration::from_secs(10),
      lock_timeout: Duration::from_secs(300),
    }
  }
}

pub struct JobRunner {
  jobs: Arc<dyn JobStore>,
  registry: Arc<JobRegistry>,
  reconciler: Option<Reconciler>,
  config: RunnerConfig,
}

impl JobRunner {
  pub fn new(jobs: Arc<dyn JobStore>, registry: Arc<JobRegistry>, config: RunnerConfig) -> Self {
    Self {
      jobs,
      registry,
      reconciler: None,
      config,
    }
  }

  pub fn with_reconciler(mut self, reconciler: Reconciler) -> Self {
    self.reconciler = Some(reconciler);
    self
  }

  pub fn config(&self) -> &RunnerConfig {
    &self.config
  }

  /// Locks taken before this instant are stale.
  fn stale_before(&self, now: DateTime<Utc>) -> DateTime<Utc> {
    TimeDelta::from_std(self.config.lock_timeout)
      .ok()
      .and_then(|timeout| now.checked_sub_signed(timeout))
      .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
  }

  /// Claims the currently due jobs and spawns their execution into `in_flight`.
  /// Returns how many jobs this runner claimed.
  #[instrument(name = "JobRunner::poll_once", skip_all, fields(worker_id = %self.config.worker_id))]
  pub async fn poll_once(&self, in_flight: &mut JoinSet<()>) -> BistroResult<usize> {
    let now = Utc::now();
    let stale_before = self.stale_before(now);
    let due = self.jobs.due(now, stale_before, self.config.batch_size).await?;
    if due.is_empty() {
      return Ok(0);
    }
    debug!(count = due.len(), "Found due jobs.");

    let mut claimed = 0;
    for candidate in due {
      match self.jobs.claim(candidate.id, &self.config.worker_id, Utc::now(), stale_before).await {
        Ok(Some(job)) => {
          if candidate.state == JobState::Locked {
            warn!(
              job_id = %job.id,
              previous_holder = candidate.locked_by.as_deref().unwrap_or("unknown"),
              "Reclaimed job with a stale lock."
            );
          }
          claimed += 1;
          let span = tracing::info_span!("job", job_id = %job.id, job_type = %job.job_type);
          in_flight.spawn(execute_job(Arc::clone(&self.jobs), Arc::clone(&self.registry), job).instrument(span));
        }
        Ok(None) => debug!(job_id = %candidate.id, "Job already claimed elsewhere."),
        Err(e) => error!(job_id = %candidate.id, error = %e, "Failed to claim job."),
      }
    }
    Ok(claimed)
  }

  /// Runs one poll and waits for every job it claimed to finish.
  pub async fn run_due_now(&self) -> BistroResult<usize> {
    let mut in_flight = JoinSet::new();
    let claimed = self.poll_once(&mut in_flight).await?;
    while let Some(joined) = in_flight.join_next().await {
      if let Err(e) = joined {
        error!(error = %e, "Job task panicked.");
      }
    }
    Ok(claimed)
  }

  /// Starts the polling loop on the current tokio runtime.
  pub fn start(self) -> RunnerHandle {
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
      let mut poll_timer = interval(self.config.poll_interval.max(Duration::from_millis(1)));
      poll_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
      let mut reconcile_timer = match (&self.reconciler, self.config.reconcile_interval.is_zero()) {
        (Some(_), false) => {
          let mut timer = interval(self.config.reconcile_interval);
          timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
          Some(timer)
        }
        _ => None,
      };
      let mut in_flight: JoinSet<()> = JoinSet::new();

      info!(
        worker_id = %self.config.worker_id,
        poll_interval_ms = self.config.poll_interval.as_millis() as u64,
        job_types = ?self.registry.job_types(),
        "Job runner started."
      );

      loop {
        tokio::select! {
          changed = shutdown_rx.changed() => {
            // A dropped handle also stops the runner.
            if changed.is_err() || *shutdown_rx.borrow() {
              info!("Job runner received shutdown signal.");
              break;
            }
          }
          _ = poll_timer.tick() => {
            if let Err(e) = self.poll_once(&mut in_flight).await {
              error!(error = %e, "Error polling scheduled jobs.");
            }
          }
          _ = next_tick(&mut reconcile_timer) => {
            if let Some(reconciler) = &self.reconciler {
              if let Err(e) = reconciler.sweep().await {
                error!(error = %e, "Reconciliation sweep failed.");
              }
            }
          }
          Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
            if let Err(e) = joined {
              error!(error = %e, "Job task panicked.");
            }
          }
        }
      }

      self.drain(in_flight).await;
      info!(worker_id = %self.config.worker_id, "Job runner stopped.");
    });

    RunnerHandle { shutdown_tx, task }
  }

  async fn drain(&self, mut in_flight: JoinSet<()>) {
    if in_flight.is_empty() {
      return;
    }
    info!(count = in_flight.len(), "Waiting for in-flight jobs.");
    let drained = tokio::time::timeout(self.config.shutdown_grace, async {
      while in_flight.join_next().await.is_some() {}
    })
    .await;
    if drained.is_err() {
      // Abandoned jobs stay `locked` until their lock goes stale.
      warn!(abandoned = in_flight.len(), "Shutdown grace elapsed, abandoning in-flight jobs.");
      in_flight.abort_all();
    }
  }
}

async fn next_tick(timer: &mut Option<Interval>) {
  match timer {
    Some(timer) => {
      timer.tick().await;
    }
    None => std::future::pending().await,
  }
}

/// Executes one claimed job and records its outcome.
async fn execute_job(jobs: Arc<dyn JobStore>, registry: Arc<JobRegistry>, job: ScheduledJob) {
  let recorded = match registry.dispatch(&job).await {
    Ok(()) => {
      debug!("Job finished.");
      jobs.mark_done(job.id, Utc::now()).await
    }
    Err(e) => {
      // No automatic retry: the job stays failed until an operator intervenes.
      error!(error = %e, "Job handler failed.");
      jobs.mark_failed(job.id, &e.to_string(), Utc::now()).await
    }
  };
  if let Err(e) = recorded {
    error!(error = %e, "Failed to record job outcome; job stays locked until its lock goes stale.");
  }
}

/// Handle to a started runner.
#[derive(Debug)]
pub struct RunnerHandle {
  shutdown_tx: watch::Sender<bool>,
  task: JoinHandle<()>,
}

impl RunnerHandle {
  /// Stops polling and waits for the loop (and its in-flight grace period) to end.
  pub async fn shutdown(self) {
    let _ = self.shutdown_tx.send(true);
    if let Err(e) = self.task.await {
      error!(error = %e, "Job runner task ended abnormally.");
    }
  }

  pub fn is_finished(&self) -> bool {
    self.task.is_finished()
  }
}
