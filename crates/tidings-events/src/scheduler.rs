//! Delivery schedulers.
//!
//! A subscription without a scheduler is delivered inline on the posting
//! thread. A subscription with one has each delivery handed to that
//! scheduler as a [`Job`], and `post` returns without waiting for it.

use std::collections::VecDeque;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};
use std::sync::{Mutex, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::center::panic_message;
use crate::error::{EventsError, EventsResult};

/// A unit of deferred delivery.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// An execution context that subscription callbacks can be routed to.
///
/// Implementations must run jobs in the order they were scheduled if they
/// want registration order to carry over to delivery order.
pub trait Scheduler: Send + Sync {
    /// Enqueue a job.
    ///
    /// # Errors
    ///
    /// Returns an error if the scheduler can no longer accept work. The job
    /// is dropped without running.
    fn schedule(&self, job: Job) -> EventsResult<()>;

    /// Optional name for debugging.
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "anonymous"
    }
}

/// FIFO queue drained by a single tokio task.
///
/// Jobs run one at a time in enqueue order. They run synchronously inside
/// the task, so a slow handler holds a runtime worker for its duration.
/// A job that panics is logged and discarded; the worker keeps draining.
/// The worker exits once every handle to the queue is dropped and the
/// backlog is drained.
pub struct SerialQueue {
    name: String,
    sender: mpsc::UnboundedSender<Job>,
}

impl SerialQueue {
    /// Spawn a queue worker on the given runtime.
    #[must_use]
    pub fn spawn(name: impl Into<String>, handle: &Handle) -> Self {
        let name = name.into();
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();

        let worker_name = name.clone();
        handle.spawn(async move {
            while let Some(job) = receiver.recv().await {
                if let Err(payload) = catch_unwind(AssertUnwindSafe(job)) {
                    warn!(
                        queue = %worker_name,
                        error = %panic_message(payload.as_ref()),
                        "Delivery job panicked"
                    );
                }
            }
            debug!(queue = %worker_name, "Delivery queue stopped");
        });

        debug!(queue = %name, "Delivery queue started");
        Self { name, sender }
    }

    /// Spawn a queue worker on the runtime of the calling context.
    ///
    /// # Errors
    ///
    /// Returns [`EventsError::NoRuntime`] when called outside a tokio runtime.
    pub fn current(name: impl Into<String>) -> EventsResult<Self> {
        let handle = Handle::try_current().map_err(|e| EventsError::NoRuntime(e.to_string()))?;
        Ok(Self::spawn(name, &handle))
    }

    /// Wait until every job scheduled before this call has run.
    ///
    /// # Errors
    ///
    /// Returns [`EventsError::QueueClosed`] if the worker has stopped.
    pub async fn flush(&self) -> EventsResult<()> {
        let (done, wait) = oneshot::channel();
        self.schedule(Box::new(move || {
            let _ = done.send(());
        }))?;
        wait.await.map_err(|_| self.closed())
    }

    fn closed(&self) -> EventsError {
        EventsError::QueueClosed {
            name: self.name.clone(),
        }
    }
}

impl Scheduler for SerialQueue {
    fn schedule(&self, job: Job) -> EventsResult<()> {
        self.sender.send(job).map_err(|_| self.closed())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for SerialQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialQueue")
            .field("name", &self.name)
            .field("closed", &self.sender.is_closed())
            .finish()
    }
}

/// FIFO queue drained explicitly by its owner.
///
/// Useful for delivering on a specific thread (a UI or main loop calls
/// [`run_pending`](Self::run_pending) each tick) and for deterministic tests.
#[derive(Default)]
pub struct LocalQueue {
    name: String,
    jobs: Mutex<VecDeque<Job>>,
}

impl LocalQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            jobs: Mutex::new(VecDeque::new()),
        }
    }

    /// Run every job that was queued when this call started.
    ///
    /// Jobs scheduled while draining are left for the next call. Returns
    /// the number of jobs run.
    ///
    /// A panicking job unwinds out of this call. The jobs behind it are put
    /// back at the front of the queue for the next drain.
    pub fn run_pending(&self) -> usize {
        let mut pending = std::mem::take(&mut *self.lock());
        let mut count = 0_usize;
        while let Some(job) = pending.pop_front() {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(job)) {
                let mut jobs = self.lock();
                while let Some(job) = pending.pop_back() {
                    jobs.push_front(job);
                }
                drop(jobs);
                resume_unwind(payload);
            }
            count = count.saturating_add(1);
        }
        count
    }

    /// Number of jobs waiting to run.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no jobs are waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Job>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Scheduler for LocalQueue {
    fn schedule(&self, job: Job) -> EventsResult<()> {
        self.lock().push_back(job);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for LocalQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalQueue")
            .field("name", &self.name)
            .field("pending", &self.len())
            .finish()
    }
}
