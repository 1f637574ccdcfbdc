use std::{future::Future, time::Duration};

use tokio::{task::JoinHandle, time::sleep};

/// Handle to work deferred with [`schedule`].
///
/// Cancelling is a courtesy: scheduled work must still re-check that its target session
/// exists and is in the expected state when it fires.
#[derive(Debug)]
pub struct ScheduledTask {
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    /// Stop the task if it has not fired yet.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Run `work` on the runtime after `delay`.
pub fn schedule<F>(delay: Duration, work: F) -> ScheduledTask
where
    F: Future<Output = ()> + Send + 'static,
{
    let handle = tokio::spawn(async move {
        sleep(delay).await;
        work.await;
    });
    ScheduledTask { handle }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    };

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn work_runs_after_the_delay() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        let task = schedule(Duration::from_secs(2), async move {
            flag.store(true, Ordering::SeqCst);
        });

        sleep(Duration::from_millis(1_900)).await;
        assert!(!fired.load(Ordering::SeqCst));

        sleep(Duration::from_millis(200)).await;
        assert!(fired.load(Ordering::SeqCst));
        assert!(task.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_work_never_runs() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        let task = schedule(Duration::from_secs(2), async move {
            flag.store(true, Ordering::SeqCst);
        });

        task.cancel();
        sleep(Duration::from_secs(5)).await;
        assert!(!fired.load(Ordering::SeqCst));
    }
}
