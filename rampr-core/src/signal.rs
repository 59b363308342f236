use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// One-shot async flag: fired once, observed by any number of waiters.
/// Used for the drain stop flag, the hard-cancel flag, and external
/// run cancellation.
#[derive(Debug, Default)]
pub struct Signal {
    fired: AtomicBool,
    notify: Notify,
}

impl Signal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fire(&self) {
        self.fired.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    pub async fn wait(&self) {
        if self.is_fired() {
            return;
        }

        let mut notified = std::pin::pin!(self.notify.notified());
        loop {
            // Register before re-checking the flag so a concurrent
            // `fire` cannot slip between the check and the wait.
            notified.as_mut().enable();
            if self.is_fired() {
                return;
            }
            notified.as_mut().await;
            if self.is_fired() {
                return;
            }
            notified.set(self.notify.notified());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn wait_returns_immediately_when_already_fired() {
        let s = Signal::new();
        s.fire();
        s.wait().await;
        assert!(s.is_fired());
    }

    #[tokio::test]
    async fn wait_wakes_on_fire() {
        let s = Arc::new(Signal::new());
        let waiter = {
            let s = s.clone();
            tokio::spawn(async move { s.wait().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        s.fire();

        let joined = tokio::time::timeout(Duration::from_secs(1), waiter).await;
        assert!(matches!(joined, Ok(Ok(()))));
    }
}
