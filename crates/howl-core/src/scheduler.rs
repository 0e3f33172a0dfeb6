//! Fire-and-forget delayed actions.

use std::time::Duration;

use futures::future::BoxFuture;
use tracing::trace;

/// Runs actions after a delay without reporting back.
///
/// Submissions never block the caller and scheduled actions carry no result.
/// There is no cancellation.
pub trait Scheduler: Send + Sync + 'static {
    fn schedule(&self, delay: Duration, action: BoxFuture<'static, ()>);
}

/// A [`Scheduler`] backed by the ambient tokio runtime.
///
/// Must be used from within a tokio runtime context.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, action: BoxFuture<'static, ()>) {
        trace!(delay_ms = delay.as_millis() as u64, "Scheduling delayed action");
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action.await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_action_runs_after_delay() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);

        TokioScheduler.schedule(
            Duration::from_secs(5),
            async move { flag.store(true, Ordering::SeqCst) }.boxed(),
        );

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(!ran.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(ran.load(Ordering::SeqCst));
    }
}
