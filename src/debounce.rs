use std::future::Future;
use std::time::Duration;

use futures::future::{AbortHandle, Abortable};
use tokio::sync::mpsc;

pub const SEARCH_DELAY: Duration = Duration::from_millis(350);
pub const CONTACT_LOOKUP_DELAY: Duration = Duration::from_millis(220);
pub const AUTOSAVE_DELAY: Duration = Duration::from_millis(2500);
pub const CLOSE_AFTER_SEND_DELAY: Duration = Duration::from_millis(900);
pub const SYNC_FOLLOW_UP_DELAY: Duration = Duration::from_millis(4000);
pub const SYNC_STATUS_RESET_DELAY: Duration = Duration::from_millis(2500);

/// A delayed, cancellable task slot where only the latest result counts.
///
/// Scheduling aborts whatever is still pending (its timer *and* any request
/// it already started). Results are tagged with the generation that produced
/// them and anything older than the current generation is discarded, so a
/// slow superseded request can never overwrite a newer one.
pub struct Debouncer<T> {
    delay: Duration,
    generation: u64,
    pending: Option<AbortHandle>,
    tx: mpsc::UnboundedSender<(u64, T)>,
    rx: mpsc::UnboundedReceiver<(u64, T)>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Debouncer {
            delay,
            generation: 0,
            pending: None,
            tx,
            rx,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Run `job` after the delay unless rescheduled or cancelled first.
    /// Must be called from within a tokio runtime.
    pub fn schedule<F, Fut>(&mut self, job: F) -> u64
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        self.cancel();
        self.generation += 1;
        let generation = self.generation;
        let delay = self.delay;
        let tx = self.tx.clone();
        let (handle, registration) = AbortHandle::new_pair();
        let task = async move {
            tokio::time::sleep(delay).await;
            let out = job().await;
            let _ = tx.send((generation, out));
        };
        tokio::spawn(Abortable::new(task, registration));
        self.pending = Some(handle);
        generation
    }

    /// Schedule a bare timer; the result is just the tick.
    pub fn schedule_tick(&mut self) -> u64
    where
        T: Default,
    {
        self.schedule(|| async { T::default() })
    }

    /// Abort the pending task and invalidate anything it may still deliver.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
            self.generation += 1;
        }
    }

    /// Wait for the current task's result. `None` when nothing is pending.
    pub async fn next(&mut self) -> Option<T> {
        while self.pending.is_some() {
            match self.rx.recv().await {
                Some((generation, value)) if generation == self.generation => {
                    self.pending = None;
                    return Some(value);
                }
                Some((generation, _)) => {
                    log::debug!("Dropping stale debounced result (gen {})", generation);
                }
                None => break,
            }
        }
        None
    }

    /// Non-blocking variant of [`Debouncer::next`].
    pub fn try_next(&mut self) -> Option<T> {
        while let Ok((generation, value)) = self.rx.try_recv() {
            if generation == self.generation && self.pending.is_some() {
                self.pending = None;
                return Some(value);
            }
        }
        None
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn only_latest_schedule_runs() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut d = Debouncer::new(SEARCH_DELAY);
        for q in ["f", "fa", "fat"] {
            let runs = runs.clone();
            d.schedule(move || async move {
                runs.fetch_add(1, Ordering::SeqCst);
                q.to_string()
            });
            tokio::time::advance(Duration::from_millis(100)).await;
        }
        assert_eq!(d.next().await.as_deref(), Some("fat"));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!d.is_pending());
        assert_eq!(d.next().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_in_flight_job_is_aborted() {
        let finished = Arc::new(AtomicUsize::new(0));
        let mut d = Debouncer::new(CONTACT_LOOKUP_DELAY);
        let f = finished.clone();
        d.schedule(move || async move {
            // Slow request that outlives the next keystroke.
            tokio::time::sleep(Duration::from_secs(5)).await;
            f.fetch_add(1, Ordering::SeqCst);
            "old"
        });
        tokio::time::sleep(Duration::from_millis(300)).await;
        d.schedule(|| async { "new" });
        assert_eq!(d.next().await, Some("new"));
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_discards_pending() {
        let mut d: Debouncer<()> = Debouncer::new(AUTOSAVE_DELAY);
        d.schedule_tick();
        d.cancel();
        tokio::time::sleep(AUTOSAVE_DELAY * 2).await;
        assert_eq!(d.try_next(), None);
        assert_eq!(d.next().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn tick_fires_after_delay() {
        let mut d: Debouncer<()> = Debouncer::new(CLOSE_AFTER_SEND_DELAY);
        let started = tokio::time::Instant::now();
        d.schedule_tick();
        assert_eq!(d.try_next(), None);
        assert_eq!(d.next().await, Some(()));
        assert!(started.elapsed() >= CLOSE_AFTER_SEND_DELAY);
    }
}
