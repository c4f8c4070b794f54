//! Session-wide stop signal.
//!
//! Every long-running loop selects on [`Shutdown::wait`] next to its own
//! receive, so a single `trigger` stops fighters, the network tasks and the
//! renderer without leaving tasks parked on channels.

use std::fmt;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// The player pressed the quit key.
    Quit,
    /// The server closed the connection or a read/write failed.
    Disconnected,
    /// A `kill` directive arrived.
    Defeat,
    /// A `win` directive arrived.
    Victory,
}

impl ShutdownReason {
    pub fn is_game_over(self) -> bool {
        matches!(self, ShutdownReason::Defeat | ShutdownReason::Victory)
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ShutdownReason::Quit => "quit",
            ShutdownReason::Disconnected => "disconnected",
            ShutdownReason::Defeat => "defeat",
            ShutdownReason::Victory => "victory",
        };
        f.write_str(text)
    }
}

/// Cloneable handle on the stop signal. The first trigger wins.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: watch::Sender<Option<ShutdownReason>>,
    rx: watch::Receiver<Option<ShutdownReason>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(None);
        Self { tx, rx }
    }

    pub fn trigger(&self, reason: ShutdownReason) {
        self.tx.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(reason);
                true
            } else {
                false
            }
        });
    }

    pub fn reason(&self) -> Option<ShutdownReason> {
        *self.rx.borrow()
    }

    pub fn is_triggered(&self) -> bool {
        self.reason().is_some()
    }

    /// Resolves once the signal has been triggered.
    pub async fn wait(&self) -> ShutdownReason {
        let mut rx = self.rx.clone();
        loop {
            if let Some(reason) = *rx.borrow_and_update() {
                return reason;
            }
            if rx.changed().await.is_err() {
                return ShutdownReason::Disconnected;
            }
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
