//! Debounced scheduling of refresh work.
//!
//! Each component owns its own [`Debouncer`]. Scheduling while a run is
//! pending resets the quiet period instead of queueing more work; once the
//! window elapses only the most recently scheduled job runs.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

/// Number of items processed between cooperative yields in large loops.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Cancel-and-reschedule timer.
#[derive(Debug)]
pub struct Debouncer {
    name: &'static str,
    window: Duration,
    generation: Arc<AtomicU64>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    /// Create a debouncer with the given quiet period.
    #[must_use]
    pub fn new(name: &'static str, window: Duration) -> Self {
        Self {
            name,
            window,
            generation: Arc::new(AtomicU64::new(0)),
            pending: Mutex::new(None),
        }
    }

    /// Quiet period.
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Schedule `job` to run once the window elapses without another call.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let current = Arc::clone(&self.generation);
        let window = self.window;
        let name = self.name;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            if current.load(Ordering::SeqCst) != generation {
                return;
            }
            tracing::trace!(debouncer = name, "Debounce window elapsed");
            job.await;
        });

        // The superseded task wakes on a stale generation and exits; a job that
        // already started is never interrupted
        let previous = self.pending.lock().replace(handle);
        if previous.is_some_and(|p| !p.is_finished()) {
            tracing::trace!(debouncer = name, "Debounce window reset");
        }
    }

    /// Drop any pending job.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = self.pending.lock().take() {
            handle.abort();
        }
    }

    /// Whether a scheduled job has not completed yet.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.get_mut().take() {
            handle.abort();
        }
    }
}

/// Yield back to the scheduler between chunks of a long enumeration.
pub async fn yield_between_batches(processed: usize, batch_size: usize) {
    if batch_size > 0 && processed > 0 && processed % batch_size == 0 {
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter_job(counter: &Arc<AtomicUsize>) -> impl Future<Output = ()> + Send + 'static {
        let counter = Arc::clone(counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_after_window() {
        let debouncer = Debouncer::new("test", Duration::from_millis(500));
        let counter = Arc::new(AtomicUsize::new(0));

        debouncer.schedule(counter_job(&counter));
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert!(debouncer.is_pending());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_collapses_to_one_run() {
        let debouncer = Debouncer::new("test", Duration::from_millis(500));
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            debouncer.schedule(counter_job(&counter));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_event_resets_window() {
        let debouncer = Debouncer::new("test", Duration::from_millis(500));
        let counter = Arc::new(AtomicUsize::new(0));

        debouncer.schedule(counter_job(&counter));
        tokio::time::sleep(Duration::from_millis(400)).await;
        debouncer.schedule(counter_job(&counter));
        tokio::time::sleep(Duration::from_millis(400)).await;
        // 800ms since first call, 400ms since the reset
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel() {
        let debouncer = Debouncer::new("test", Duration::from_millis(100));
        let counter = Arc::new(AtomicUsize::new(0));

        debouncer.schedule(counter_job(&counter));
        debouncer.cancel();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_aborts_pending() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let debouncer = Debouncer::new("test", Duration::from_millis(100));
            debouncer.schedule(counter_job(&counter));
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_yield_between_batches() {
        // Only checks that yielding at and between boundaries completes
        for processed in 0..1_001 {
            yield_between_batches(processed, DEFAULT_BATCH_SIZE).await;
        }
        yield_between_batches(10, 0).await;
    }
}
