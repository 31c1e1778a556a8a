use std::future::Future;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

/// Runs tasks one at a time with a minimum gap between the end of one task and the start of the
/// next.
///
/// Callers queue on an async mutex (FIFO), so concurrent callers are serialized in arrival order.
pub struct SerialScheduler {
    spacing: Duration,
    last_finished: Mutex<Option<Instant>>,
}

impl SerialScheduler {
    pub fn new(spacing: Duration) -> Self {
        Self {
            spacing,
            last_finished: Mutex::new(None),
        }
    }

    pub fn spacing(&self) -> Duration {
        self.spacing
    }

    pub async fn run<F, T>(&self, task: F) -> T
    where
        F: Future<Output = T>,
    {
        self.run_spaced(self.spacing, task).await
    }

    /// Like [`run`](Self::run) with an explicit gap for this task.
    pub async fn run_spaced<F, T>(&self, spacing: Duration, task: F) -> T
    where
        F: Future<Output = T>,
    {
        let mut last = self.last_finished.lock().await;
        if let Some(finished) = *last {
            tokio::time::sleep_until(finished + spacing).await;
        }
        let output = task.await;
        *last = Some(Instant::now());
        output
    }
}
