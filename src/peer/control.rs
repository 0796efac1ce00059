use std::sync::Arc;

use tokio::sync::watch;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RunState {
    Running,
    Paused,
    Stopped,
}

/// Controller side of the pause/stop signal shared by every session of a download.
#[derive(Debug, Clone)]
pub struct Control {
    tx: Arc<watch::Sender<RunState>>,
}

impl Default for Control {
    fn default() -> Self {
        Self::new()
    }
}

impl Control {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(RunState::Running);
        Self { tx: Arc::new(tx) }
    }

    #[allow(dead_code)]
    pub fn pause(&self) {
        self.set(RunState::Paused);
    }

    #[allow(dead_code)]
    pub fn resume(&self) {
        self.set(RunState::Running);
    }

    /// Stopping is final, a stopped download cannot be resumed.
    pub fn stop(&self) {
        self.set(RunState::Stopped);
    }

    #[allow(dead_code)]
    pub fn state(&self) -> RunState {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> RunSignal {
        RunSignal(self.tx.subscribe())
    }

    fn set(&self, state: RunState) {
        self.tx.send_if_modified(|current| {
            if *current == state || *current == RunState::Stopped {
                return false;
            }
            *current = state;
            true
        });
    }
}

/// Session side of [`Control`].
#[derive(Debug, Clone)]
pub struct RunSignal(watch::Receiver<RunState>);

impl RunSignal {
    /// Waits while the download is paused. Returns `false` once it was stopped (or the controller
    /// went away while paused) and `true` when the session may go on.
    pub async fn proceed(&mut self) -> bool {
        loop {
            let state = *self.0.borrow_and_update();
            match state {
                RunState::Running => return true,
                RunState::Stopped => return false,
                RunState::Paused => {
                    if self.0.changed().await.is_err() {
                        return false;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;

    #[tokio::test]
    async fn running_proceeds_immediately() {
        let control = Control::new();

        assert!(control.subscribe().proceed().await);
    }

    #[tokio::test]
    async fn paused_waits_for_resume() {
        let control = Control::new();
        let mut signal = control.subscribe();
        control.pause();

        let waiting = timeout(Duration::from_millis(50), signal.proceed()).await;
        assert!(waiting.is_err());

        let handle = tokio::spawn(async move { signal.proceed().await });
        control.resume();

        assert!(handle.await.unwrap());
    }

    #[tokio::test]
    async fn stop_wakes_paused_sessions() {
        let control = Control::new();
        let mut signal = control.subscribe();
        control.pause();

        let handle = tokio::spawn(async move { signal.proceed().await });
        control.stop();

        assert!(!handle.await.unwrap());
    }

    #[tokio::test]
    async fn stop_is_final() {
        let control = Control::new();
        control.stop();
        control.resume();

        assert_eq!(control.state(), RunState::Stopped);
        assert!(!control.subscribe().proceed().await);
    }

    #[tokio::test]
    async fn dropped_controller_while_paused_stops() {
        let control = Control::new();
        let mut signal = control.subscribe();
        control.pause();
        drop(control);

        assert!(!signal.proceed().await);
    }
}
