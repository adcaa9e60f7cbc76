//! Bounded worker pool with one-shot task handles.
//!
//! Each invocation that fans out work (a partitioned dataset write, a batch of
//! fetches) owns its own [`WorkerPool`]. Tasks run on a dedicated rayon pool
//! and report through a per-task channel, so the caller can wait on handles in
//! submission order with a timeout.
//!
//! Timed-out tasks are not cancelled. Their eventual result is discarded.

use crate::error::{Error, Result};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

/// Default number of worker threads: half the CPUs, at least one.
#[must_use]
pub fn default_threads() -> usize {
    (num_cpus::get() / 2).max(1)
}

pub struct WorkerPool {
    pool: rayon::ThreadPool,
    threads: usize,
}

impl WorkerPool {
    /// Build a pool with `threads` workers, or [`default_threads`] if `None`.
    ///
    /// # Errors
    /// Returns [`Error::Config`] for zero threads or if the OS refuses to
    /// spawn them.
    pub fn new(threads: Option<usize>) -> Result<Self> {
        let threads = threads.unwrap_or_else(default_threads);
        if threads == 0 {
            return Err(Error::config("worker pool needs at least one thread"));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("recordshift-worker-{i}"))
            .build()
            .map_err(|e| Error::config(format!("build worker pool: {e}")))?;
        Ok(Self { pool, threads })
    }

    #[must_use]
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Queue `job` and return a handle for its result.
    ///
    /// A panic inside `job` is reported as [`Error::TaskFailed`].
    pub fn submit<T, F>(&self, name: impl Into<String>, job: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let name = name.into();
        let (tx, rx) = mpsc::sync_channel(1);
        let task = name.clone();
        self.pool.spawn(move || {
            let result = catch_unwind(AssertUnwindSafe(job)).unwrap_or_else(|panic| {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(ToString::to_string)
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "panicked".to_string());
                Err(Error::TaskFailed { task, message })
            });
            // The receiver is gone if the caller timed out; nothing to report.
            let _ = tx.send(result);
        });
        TaskHandle { name, rx }
    }
}

/// Result slot of one submitted task.
pub struct TaskHandle<T> {
    name: String,
    rx: Receiver<Result<T>>,
}

impl<T> TaskHandle<T> {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Block until the task reports or `timeout` elapses.
    ///
    /// # Errors
    /// Returns the task's own error, [`Error::Timeout`] if it did not report
    /// in time, or [`Error::TaskFailed`] if it exited without a result.
    pub fn wait(self, timeout: Duration) -> Result<T> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(Error::Timeout {
                task: self.name,
                after: timeout,
            }),
            Err(RecvTimeoutError::Disconnected) => Err(Error::TaskFailed {
                task: self.name,
                message: "worker exited without a result".into(),
            }),
        }
    }
}

/// Wait on every handle in submission order, each with its own timeout, and
/// return every outcome paired with the task name.
pub fn wait_all<T>(handles: Vec<TaskHandle<T>>, timeout: Duration) -> Vec<(String, Result<T>)> {
    handles
        .into_iter()
        .map(|h| {
            let name = h.name.clone();
            (name, h.wait(timeout))
        })
        .collect()
}

/// Wait on every handle, then raise the first failure in submission order.
///
/// Every task is awaited even after a failure has been seen.
///
/// # Errors
/// Returns the first task error encountered.
pub fn join_all<T>(handles: Vec<TaskHandle<T>>, timeout: Duration) -> Result<Vec<T>> {
    let outcomes = wait_all(handles, timeout);
    let failed = outcomes.iter().filter(|(_, r)| r.is_err()).count();
    if failed > 0 {
        log::warn!("{failed} of {} task(s) failed", outcomes.len());
    }
    outcomes.into_iter().map(|(_, r)| r).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn results_come_back_in_submission_order() {
        let pool = WorkerPool::new(Some(3)).unwrap();
        let handles: Vec<_> = (0..10_u64)
            .map(|i| {
                pool.submit(format!("t{i}"), move || {
                    std::thread::sleep(Duration::from_millis(10 - i));
                    Ok(i * 2)
                })
            })
            .collect();
        let out = join_all(handles, Duration::from_secs(5)).unwrap();
        assert_eq!(out, (0..10).map(|i| i * 2).collect::<Vec<_>>());
    }

    #[test]
    fn every_task_is_awaited_before_first_error() {
        let pool = WorkerPool::new(Some(2)).unwrap();
        let done = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..6)
            .map(|i| {
                let done = Arc::clone(&done);
                pool.submit(format!("t{i}"), move || {
                    std::thread::sleep(Duration::from_millis(5));
                    done.fetch_add(1, Ordering::SeqCst);
                    if i == 1 || i == 4 {
                        Err(Error::Schema(format!("boom {i}")))
                    } else {
                        Ok(())
                    }
                })
            })
            .collect();
        let err = join_all(handles, Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, Error::Schema(ref m) if m == "boom 1"));
        assert_eq!(done.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn timeout_and_panic_are_reported() {
        let pool = WorkerPool::new(Some(2)).unwrap();
        let slow = pool.submit("slow", || {
            std::thread::sleep(Duration::from_millis(300));
            Ok(())
        });
        assert!(matches!(
            slow.wait(Duration::from_millis(10)),
            Err(Error::Timeout { ref task, .. }) if task == "slow"
        ));

        let boom = pool.submit::<(), _>("boom", || panic!("kaboom"));
        assert!(matches!(
            boom.wait(Duration::from_secs(5)),
            Err(Error::TaskFailed { ref message, .. }) if message == "kaboom"
        ));
    }

    #[test]
    fn zero_threads_is_config_error() {
        assert!(matches!(WorkerPool::new(Some(0)), Err(Error::Config(_))));
        assert!(default_threads() >= 1);
    }
}
