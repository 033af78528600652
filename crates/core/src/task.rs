//! Fixed-period background work with guaranteed cancellation.

use std::ops::ControlFlow;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Handle to a task that calls a closure every `period`.
///
/// The first call happens one period after [`PeriodicTask::spawn`]. The task
/// ends when the closure returns [`ControlFlow::Break`], when
/// [`PeriodicTask::cancel`] is called, or when the handle is dropped.
#[derive(Debug)]
pub struct PeriodicTask {
    name: &'static str,
    cancel: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    /// Must be called from within a tokio runtime; `period` must be non-zero.
    pub fn spawn<F>(name: &'static str, period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
    {
        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = &mut cancel_rx => {
                        tracing::debug!(task = name, "cancelled");
                        break;
                    }
                    _ = interval.tick() => {
                        if tick().is_break() {
                            tracing::debug!(task = name, "finished");
                            break;
                        }
                    }
                }
            }
        });

        Self {
            name,
            cancel: Some(cancel_tx),
            handle,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Stop the task. No tick starts after this returns; calling it again is a
    /// no-op.
    pub fn cancel(&mut self) {
        if let Some(tx) = self.cancel.take() {
            let _ = tx.send(());
        }
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn counter() -> (Arc<AtomicU32>, impl FnMut() -> ControlFlow<()> + Send + 'static) {
        let count = Arc::new(AtomicU32::new(0));
        let inner = count.clone();
        (count, move || {
            inner.fetch_add(1, Ordering::SeqCst);
            ControlFlow::Continue(())
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_after_one_period() {
        let (count, tick) = counter();
        let _task = PeriodicTask::spawn("count", Duration::from_secs(8), tick);

        tokio::time::sleep(Duration::from_secs(7)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(16)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_break_stops_task() {
        let count = Arc::new(AtomicU32::new(0));
        let inner = count.clone();
        let task = PeriodicTask::spawn("until-two", Duration::from_secs(1), move || {
            if inner.fetch_add(1, Ordering::SeqCst) + 1 >= 2 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(task.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_ticks() {
        let (count, tick) = counter();
        let mut task = PeriodicTask::spawn("count", Duration::from_secs(1), tick);

        tokio::time::sleep(Duration::from_millis(2500)).await;
        task.cancel();
        task.cancel();
        let seen = count.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(seen, 2);
        assert_eq!(count.load(Ordering::SeqCst), seen);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let (count, tick) = counter();
        let task = PeriodicTask::spawn("count", Duration::from_secs(1), tick);
        drop(task);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
