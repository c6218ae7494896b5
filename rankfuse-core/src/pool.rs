/// Fixed-size worker pool for fusion jobs.
///
/// Wraps a rayon `ThreadPool`: submission never blocks and the queue is
/// unbounded. rayon has no "wait for everything spawned" call, so the pool
/// counts pending tasks itself and lets the driver block on that count.
use std::any::Any;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, error};

use crate::error::{RankFuseError, Result};

#[derive(Debug, Default)]
struct Pending {
    count: Mutex<usize>,
    idle: Condvar,
}

impl Pending {
    fn increment(&self) {
        *self.count.lock().expect("pending counter poisoned") += 1;
    }

    fn decrement(&self) {
        let mut count = self.count.lock().expect("pending counter poisoned");
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.idle.notify_all();
        }
    }
}

/// Counts a task down when it finishes, panicking or not.
struct TaskGuard(Arc<Pending>);

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

pub struct WorkerPool {
    pool: ThreadPool,
    pending: Arc<Pending>,
}

impl WorkerPool {
    /// Start `threads` workers, or one per available core when `None`.
    pub fn new(threads: Option<usize>) -> Result<Self> {
        let threads = threads
            .filter(|&n| n > 0)
            .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, |n| n.get()));

        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("rankfuse-worker-{i}"))
            .panic_handler(|payload| error!("Worker panicked: {}", panic_message(&*payload)))
            .build()
            .map_err(|e| RankFuseError::Pool(e.to_string()))?;

        debug!("Started worker pool with {threads} threads");
        Ok(WorkerPool {
            pool,
            pending: Arc::new(Pending::default()),
        })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Queue `task` and return immediately.
    pub fn execute<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pending.increment();
        let guard = TaskGuard(Arc::clone(&self.pending));
        self.pool.spawn(move || {
            let _guard = guard;
            task();
        });
    }

    /// Tasks queued or running.
    pub fn pending(&self) -> usize {
        *self.pending.count.lock().expect("pending counter poisoned")
    }

    /// Block until no task is pending. Returns false if `timeout` ran out first.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut count = self.pending.count.lock().expect("pending counter poisoned");

        while *count > 0 {
            let wait = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    deadline - now
                }
                // Timeout too large to represent: wait in bounded slices.
                None => Duration::from_secs(3600),
            };
            count = self.pending.idle
                .wait_timeout(count, wait)
                .expect("pending counter poisoned")
                .0;
        }
        true
    }

    /// Drain the queue, then stop the workers.
    ///
    /// Returns false if the queue did not drain within `timeout`; in that case
    /// the remaining tasks keep running on detached threads.
    pub fn shutdown(self, timeout: Duration) -> bool {
        let drained = self.wait_idle(timeout);
        if !drained {
            error!("Worker pool did not drain within {timeout:?}, {} tasks still pending", self.pending());
        }
        drained
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("threads", &self.threads())
            .field("pending", &self.pending())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}
