use std::{future::Future, time::Duration};

use tokio::{task::JoinHandle, time::Instant};

/// One-shot cancellable deadline backed by a spawned sleep.
///
/// Arming always cancels the previous deadline first, so at most one task is
/// live per timer. Each arm bumps a generation; the fired task must present
/// its generation to [`DeadlineTimer::claim`] so a deadline that was cancelled
/// or re-armed while the task waited for the session lock does nothing.
#[derive(Debug, Default)]
pub struct DeadlineTimer {
    task: Option<JoinHandle<()>>,
    deadline: Option<Instant>,
    generation: u64,
}

impl DeadlineTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm<F, Fut>(&mut self, after: Duration, on_elapsed: F)
    where
        F: FnOnce(u64) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        self.generation = self.generation.wrapping_add(1);

        let deadline = Instant::now() + after;
        let fire = on_elapsed(self.generation);
        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            fire.await;
        }));
        self.deadline = Some(deadline);
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.deadline = None;
    }

    /// Called from the fired task. Disarms without aborting the caller.
    pub fn claim(&mut self, generation: u64) -> bool {
        if self.task.is_none() || self.generation != generation {
            return false;
        }
        self.task = None;
        self.deadline = None;
        true
    }

    pub fn is_armed(&self) -> bool {
        self.task.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

impl Drop for DeadlineTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
