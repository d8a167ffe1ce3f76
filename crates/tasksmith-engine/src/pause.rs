use tokio::sync::{Notify, RwLock};

/// Cooperative pause toggle: checked only at iteration boundaries, never
/// interrupts a running agent. Resume is signalled via a [`Notify`] rather
/// than the engine polling a flag in a tight loop.
#[derive(Clone)]
pub struct PauseControl {
    paused: std::sync::Arc<RwLock<bool>>,
    resume: std::sync::Arc<Notify>,
}

impl PauseControl {
    pub fn new() -> Self {
        Self {
            paused: std::sync::Arc::new(RwLock::new(false)),
            resume: std::sync::Arc::new(Notify::new()),
        }
    }

    pub async fn pause(&self) {
        *self.paused.write().await = true;
    }

    pub async fn resume(&self) {
        *self.paused.write().await = false;
        self.resume.notify_waiters();
    }

    pub async fn is_paused(&self) -> bool {
        *self.paused.read().await
    }

    pub async fn wait_for_resume(&self) {
        self.resume.notified().await;
    }
}

impl Default for PauseControl {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resume_wakes_a_waiter() {
        let control = PauseControl::new();
        control.pause().await;
        assert!(control.is_paused().await);
        let waiter = control.clone();
        let handle = tokio::spawn(async move {
            waiter.wait_for_resume().await;
        });
        tokio::task::yield_now().await;
        control.resume().await;
        handle.await.unwrap();
        assert!(!control.is_paused().await);
    }
}
