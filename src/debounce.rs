//! Debounced task scheduling with generation numbers
//!
//! Each `schedule` cancels the previous timer and bumps the generation. The
//! scheduled task receives its generation and tags its result with it; the
//! owner applies only results whose generation is still current, so a slow
//! response can never overwrite a newer one.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

pub struct Debouncer {
    delay: Duration,
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: 0,
            pending: None,
        }
    }

    /// Cancel the pending timer (if any) and invalidate outstanding results.
    pub fn cancel(&mut self) -> u64 {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        self.generation += 1;
        self.generation
    }

    /// Run `task` after the debounce delay unless superseded first.
    pub fn schedule<F, Fut>(&mut self, task: F) -> u64
    where
        F: FnOnce(u64) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let generation = self.cancel();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task(generation).await;
        }));
        generation
    }

    pub fn current(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_rapid_schedules_fire_once_with_last_generation() {
        let mut debouncer = Debouncer::new(Duration::from_millis(600));
        let fired = Arc::new(AtomicUsize::new(0));
        let last = Arc::new(AtomicU64::new(0));

        for _ in 0..5 {
            let fired = fired.clone();
            let last = last.clone();
            debouncer.schedule(move |generation| async move {
                fired.fetch_add(1, Ordering::SeqCst);
                last.store(generation, Ordering::SeqCst);
            });
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        tokio::time::sleep(Duration::from_millis(700)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(last.load(Ordering::SeqCst), debouncer.current());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_fire() {
        let mut debouncer = Debouncer::new(Duration::from_millis(500));
        let fired = Arc::new(AtomicUsize::new(0));
        let f = fired.clone();
        let generation = debouncer.schedule(move |_| async move {
            f.fetch_add(1, Ordering::SeqCst);
        });
        debouncer.cancel();
        assert!(!debouncer.is_current(generation));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spaced_schedules_each_fire() {
        let mut debouncer = Debouncer::new(Duration::from_millis(100));
        let fired = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let f = fired.clone();
            debouncer.schedule(move |_| async move {
                f.fetch_add(1, Ordering::SeqCst);
            });
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        assert_eq!(fired.load(Ordering::SeqCst), 3);
    }
}
