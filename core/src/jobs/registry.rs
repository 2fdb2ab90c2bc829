// bistro/src/jobs/registry.rs

//! Defines `JobRegistry`, a name-keyed registry of job handlers.
//! The runner dispatches every claimed job through it by `job_type`.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{event, instrument, Level};

use crate::error::{BistroError, BistroResult};
use crate::jobs::model::ScheduledJob;

/// Business logic executed for one job type.
#[async_trait]
pub trait JobHandler: Send + Sync {
  async fn handle(&self, job: &ScheduledJob) -> BistroResult<()>;
}

/// Adapts an async closure into a `JobHandler`.
struct FnJobHandler<F, Fut>
where
  F: Fn(ScheduledJob) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = BistroResult<()>> + Send + 'static,
{
  handler_fn: F,
  _phantom_fut: PhantomData<fn() -> Fut>,
}

#[async_trait]
impl<F, Fut> JobHandler for FnJobHandler<F, Fut>
where
  F: Fn(ScheduledJob) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = BistroResult<()>> + Send + 'static,
{
  async fn handle(&self, job: &ScheduledJob) -> BistroResult<()> {
    (self.handler_fn)(job.clone()).await
  }
}

pub struct JobRegistry {
  handlers: Mutex<HashMap<String, Arc<dyn JobHandler>>>,
}

impl JobRegistry {
  /// Creates a new, empty registry.
  pub fn new() -> Self {
    Self {
      handlers: Mutex::new(HashMap::new()),
    }
  }

  /// Registers `handler` for `job_type`, replacing any previous handler.
  pub fn register(&self, job_type: &str, handler: Arc<dyn JobHandler>) {
    event!(Level::DEBUG, job_type, "Registering job handler.");
    if self.handlers.lock().insert(job_type.to_string(), handler).is_some() {
      event!(Level::WARN, job_type, "Replaced an existing job handler.");
    }
  }

  /// Registers an async closure as the handler for `job_type`.
  pub fn register_fn<F, Fut>(&self, job_type: &str, handler_fn: F)
  where
    F: Fn(ScheduledJob) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = BistroResult<()>> + Send + 'static,
  {
    self.register(
      job_type,
      Arc::new(FnJobHandler {
        handler_fn,
        _phantom_fut: PhantomData,
      }),
    );
  }

  pub fn handler(&self, job_type: &str) -> Option<Arc<dyn JobHandler>> {
    self.handlers.lock().get(job_type).cloned()
  }

  pub fn job_types(&self) -> Vec<String> {
    let mut types: Vec<String> = self.handlers.lock().keys().cloned().collect();
    types.sort();
    types
  }

  /// Runs the handler registered for `job.job_type`.
  #[instrument(
    name = "JobRegistry::dispatch",
    skip_all,
    fields(job_id = %job.id, job_type = %job.job_type),
    err(Display)
  )]
  pub async fn dispatch(&self, job: &ScheduledJob) -> BistroResult<()> {
    // Clone the Arc out so the lock is released before awaiting.
    let handler = self.handler(&job.job_type).ok_or_else(|| {
      event!(Level::ERROR, "No handler registered for job type.");
      BistroError::HandlerMissing {
        job_type: job.job_type.clone(),
      }
    })?;
    handler.handle(job).await
  }
}

impl Default for JobRegistry {
  fn default() -> Self {
    Self::new()
  }
}

impl fmt::Debug for JobRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("JobRegistry").field("job_types", &self.job_types()).finish()
  }
}
