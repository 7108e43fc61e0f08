//! One-shot cancellation signals for background workers
//!
//! A signal fires by disconnecting a channel that never carries a message,
//! so workers can wait on it inside `crossbeam_channel::select!` next to
//! their other inputs.

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use parking_lot::Mutex;

/// Create a connected canceller / signal pair
pub fn cancel_pair() -> (Canceller, CancelSignal) {
    let (tx, rx) = crossbeam_channel::bounded(0);
    (
        Canceller {
            tx: Mutex::new(Some(tx)),
        },
        CancelSignal { rx },
    )
}

/// Fires the paired [`CancelSignal`]
///
/// Dropping the canceller fires the signal as well.
#[derive(Debug)]
pub struct Canceller {
    tx: Mutex<Option<Sender<()>>>,
}

impl Canceller {
    /// Fire the signal. Calling this more than once has no further effect.
    pub fn cancel(&self) {
        self.tx.lock().take();
    }

    pub fn is_cancelled(&self) -> bool {
        self.tx.lock().is_none()
    }
}

/// Observer side of a cancellation; cheap to clone
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: Receiver<()>,
}

impl CancelSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        Self {
            rx: crossbeam_channel::never(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.rx.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Receiver that becomes ready (disconnected) once the signal fires
    pub fn receiver(&self) -> &Receiver<()> {
        &self.rx
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::never()
    }
}
