//! One-shot shutdown signalling
//!
//! A [`ShutdownTrigger`] is fired at most once per run (normally from a
//! Ctrl+C handler); the orchestrator holds the matching [`ShutdownSignal`]
//! and observes it between rate samples.

use tokio::sync::watch;

/// Constructor for a trigger/signal pair
#[derive(Debug)]
pub struct Shutdown;

impl Shutdown {
    /// Create a linked trigger and signal
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (ShutdownTrigger, ShutdownSignal) {
        let (tx, rx) = watch::channel(false);
        (ShutdownTrigger { tx }, ShutdownSignal { rx })
    }
}

/// Fires the shutdown condition
#[derive(Debug, Clone)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    /// Request shutdown
    ///
    /// Returns `true` only for the call that actually flipped the condition;
    /// repeated calls are no-ops.
    pub fn trigger(&self) -> bool {
        self.tx.send_if_modified(|requested| {
            if *requested {
                false
            } else {
                *requested = true;
                true
            }
        })
    }

    /// Whether shutdown has been requested
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Another signal observing this trigger
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }
}

/// Observes the shutdown condition
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Whether shutdown has been requested
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once shutdown is requested
    ///
    /// Returns immediately if it already was. If every trigger is dropped
    /// without firing this never resolves.
    pub async fn wait(&mut self) {
        if self.rx.wait_for(|requested| *requested).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
