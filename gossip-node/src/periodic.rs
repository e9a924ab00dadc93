//! Fixed-interval background actions.
//!
//! The action is awaited inline and each run is scheduled `interval` after
//! the previous one finishes, so the action's own runtime counts toward the
//! gap between runs. A heartbeat stuck on an unresponsive peer can delay the
//! next tick by up to twice the connect timeout (connect plus write). Slow
//! runs push later runs back rather than being caught up, and runs never
//! overlap. A panic inside the action ends the task, so actions must handle
//! their own failures.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Shortest interval accepted, so a zero config cannot spin.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// A zero-argument async action run repeatedly.
pub struct PeriodicTask<F> {
    name: &'static str,
    interval: Duration,
    action: F,
}

impl<F, Fut> PeriodicTask<F>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    /// Create a task; nothing runs until [`start`](Self::start).
    pub fn new(name: &'static str, interval: Duration, action: F) -> Self {
        Self {
            name,
            interval: interval.max(MIN_INTERVAL),
            action,
        }
    }

    /// Spawn the task. The first run happens one interval from now.
    pub fn start(self) -> PeriodicHandle {
        let Self {
            name,
            interval,
            mut action,
        } = self;

        let handle = tokio::spawn(async move {
            tracing::info!("{} task started (interval: {:?})", name, interval);
            loop {
                tokio::time::sleep(interval).await;
                tracing::trace!("{} task tick", name);
                action().await;
            }
        });

        PeriodicHandle { name, handle }
    }
}

/// Handle to a running [`PeriodicTask`]. Dropping it stops the task.
#[derive(Debug)]
pub struct PeriodicHandle {
    name: &'static str,
    handle: JoinHandle<()>,
}

impl PeriodicHandle {
    /// Task name, as used in logs.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the task has stopped (aborted or panicked).
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the task.
    pub fn abort(&self) {
        self.handle.abort();
    }
}

impl Drop for PeriodicHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn counting_task(interval: Duration) -> (Arc<AtomicU32>, PeriodicHandle) {
        let count = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&count);
        let handle = PeriodicTask::new("count", interval, move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        })
        .start();
        (count, handle)
    }

    #[tokio::test]
    async fn runs_repeatedly() {
        let (count, handle) = counting_task(Duration::from_millis(10));

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(count.load(Ordering::SeqCst) >= 3);
        assert_eq!(handle.name(), "count");
    }

    #[tokio::test]
    async fn first_run_waits_one_interval() {
        let (count, _handle) = counting_task(Duration::from_secs(60));

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn dropping_handle_stops_task() {
        let (count, handle) = counting_task(Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(handle);

        // Let the abort land, then make sure nothing else runs.
        tokio::time::sleep(Duration::from_millis(20)).await;
        let stopped_at = count.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(count.load(Ordering::SeqCst), stopped_at);
    }

    #[tokio::test(start_paused = true)]
    async fn action_runtime_delays_next_run() {
        let count = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&count);
        let _handle = PeriodicTask::new("slow", Duration::from_millis(10), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(90)).await;
            }
        })
        .start();

        // Runs start at 10, 110, 210 and 310 ms.
        tokio::time::sleep(Duration::from_millis(350)).await;

        assert_eq!(count.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn panicking_action_ends_task() {
        let handle = PeriodicTask::new("boom", Duration::from_millis(5), || async {
            panic!("action failed");
        })
        .start();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished());
    }
}
