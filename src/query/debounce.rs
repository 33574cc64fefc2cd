//! Trailing-edge debounce between raw input and network fetches.
//!
//! Each `schedule` call takes a fresh generation number and spawns a task
//! that sleeps for the quiet period; when it wakes, it only runs if no newer
//! call superseded it. Superseded actions never run, so emissions cannot
//! arrive out of order. There is no max-wait: input that never pauses keeps
//! pushing the emission out.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

pub struct Debouncer {
    delay: Duration,
    generation: Arc<AtomicU64>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `action` after the quiet period unless a newer call supersedes it.
    pub fn schedule<F, Fut>(&self, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let latest = Arc::clone(&self.generation);
        let delay = self.delay;

        tokio::spawn(async move {
            sleep(delay).await;
            if latest.load(Ordering::SeqCst) == generation {
                action().await;
            }
        });
    }

    /// Drop any pending emission without scheduling a new one.
    pub fn cancel_pending(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}
