//! Idle-timeout monitor
//!
//! One cancellable timer task per authenticated session. Interaction signals
//! re-arm the timer; expiry fires the shared sign-out path exactly once.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// User interaction kinds that keep a session alive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    PointerMove,
    KeyPress,
    Scroll,
    Click,
}

/// Cloneable handle the UI layer uses to report interactions
#[derive(Debug, Clone)]
pub struct ActivityHandle {
    tx: mpsc::UnboundedSender<Interaction>,
}

impl ActivityHandle {
    /// Report an interaction, re-arming the idle timer.
    pub fn record(&self, interaction: Interaction) {
        // A closed channel means the monitor already stopped
        let _ = self.tx.send(interaction);
    }
}

/// Owns the idle timer task
#[derive(Debug)]
pub struct IdleMonitor {
    timeout: Duration,
    tx: Option<mpsc::UnboundedSender<Interaction>>,
    task: Option<JoinHandle<()>>,
}

impl IdleMonitor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            tx: None,
            task: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Start the timer, tearing down any previous registration first.
    ///
    /// `on_timeout` runs at most once; the task exits after firing.
    pub fn start<F, Fut>(&mut self, on_timeout: F) -> ActivityHandle
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.stop();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let timeout = self.timeout;
        let task = tokio::spawn(async move {
            let mut on_timeout = Some(on_timeout);
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(timeout) => {
                        tracing::info!(timeout_secs = timeout.as_secs(), "Idle timeout elapsed");
                        if let Some(fire) = on_timeout.take() {
                            fire().await;
                        }
                        return;
                    }
                    signal = rx.recv() => match signal {
                        Some(interaction) => {
                            tracing::trace!(?interaction, "Interaction, re-arming idle timer");
                        }
                        // Monitor stopped and every handle dropped
                        None => return,
                    },
                }
            }
        });

        self.tx = Some(tx.clone());
        self.task = Some(task);
        ActivityHandle { tx }
    }

    /// Cloneable activity handle for the running timer, if any
    pub fn activity_handle(&self) -> Option<ActivityHandle> {
        self.tx.as_ref().map(|tx| ActivityHandle { tx: tx.clone() })
    }

    /// Cancel the pending timer and detach every signal source.
    pub fn stop(&mut self) {
        self.tx = None;
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Whether a timer task is currently live
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for IdleMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
