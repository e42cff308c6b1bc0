//! Activity-driven session extension.
//!
//! UI surfaces report user activity as cheap signals; the watcher debounces
//! them so the session expiry is rewritten at most once per debounce window,
//! no matter how fast signals arrive.

use crate::controller::AuthController;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Debounces activity signals into session extensions.
pub struct ActivityWatcher {
    tx: mpsc::UnboundedSender<()>,
    task: JoinHandle<()>,
}

impl ActivityWatcher {
    /// Start watching. Signals arriving within `debounce` of each other
    /// collapse into a single extension.
    pub fn spawn(controller: AuthController, debounce: Duration) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();

        let task = tokio::spawn(async move {
            // First signal opens a window; everything else that arrives
            // before the window closes is drained and ignored.
            while rx.recv().await.is_some() {
                tokio::time::sleep(debounce).await;
                while rx.try_recv().is_ok() {}

                if controller.extend_session().is_some() {
                    tracing::debug!("Session extended after user activity");
                }
            }
        });

        Self { tx, task }
    }

    /// Report user activity. Never blocks; dropped if the watcher stopped.
    pub fn signal(&self) {
        let _ = self.tx.send(());
    }

    /// Stop the watcher task.
    pub fn shutdown(self) {
        drop(self.tx);
        self.task.abort();
    }
}
