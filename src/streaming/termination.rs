// One-shot session termination signal
//
// Peer disconnects (reported by the transport) and operator interrupts
// (ctrl+c / SIGTERM) both end a session. They share a single handle: the
// first trigger records its cause and cancels the token, later triggers are
// ignored.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Why a session stopped streaming
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationCause {
    PeerDisconnected,
    OperatorCancelled,
}

impl std::fmt::Display for TerminationCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminationCause::PeerDisconnected => write!(f, "peer disconnected"),
            TerminationCause::OperatorCancelled => write!(f, "operator cancelled"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Termination {
    token: CancellationToken,
    cause: Arc<Mutex<Option<TerminationCause>>>,
}

impl Termination {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            cause: Arc::new(Mutex::new(None)),
        }
    }

    /// Signal termination. Returns `false` if a cause was already recorded.
    pub fn trigger(&self, cause: TerminationCause) -> bool {
        {
            let mut slot = self.cause.lock();
            if slot.is_some() {
                return false;
            }
            *slot = Some(cause);
        }
        self.token.cancel();
        true
    }

    pub fn cause(&self) -> Option<TerminationCause> {
        *self.cause.lock()
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait until the first trigger and return its cause
    pub async fn triggered(&self) -> TerminationCause {
        self.token.cancelled().await;
        self.cause().unwrap_or(TerminationCause::PeerDisconnected)
    }
}

impl Default for Termination {
    fn default() -> Self {
        Self::new()
    }
}
