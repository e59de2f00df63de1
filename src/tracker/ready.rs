use tokio::sync::watch;

use crate::error::TrackerError;

#[derive(Debug, Clone)]
enum Readiness {
    Pending,
    Ready,
    Failed(TrackerError),
}

/// Completes a connection attempt's ready signal. Consumed on use, so each
/// attempt resolves at most once.
pub struct ReadyResolver {
    tx: watch::Sender<Readiness>,
}

/// Handle awaited by everything that needs an established connection.
#[derive(Clone)]
pub struct ReadySignal {
    rx: watch::Receiver<Readiness>,
}

/// A fresh, pending ready signal for one connection attempt.
pub fn ready_pair() -> (ReadyResolver, ReadySignal) {
    let (tx, rx) = watch::channel(Readiness::Pending);
    (ReadyResolver { tx }, ReadySignal { rx })
}

impl ReadyResolver {
    pub fn resolve(self) {
        self.tx.send_replace(Readiness::Ready);
    }

    pub fn fail(self, error: TrackerError) {
        self.tx.send_replace(Readiness::Failed(error));
    }
}

impl ReadySignal {
    pub fn is_ready(&self) -> bool {
        matches!(*self.rx.borrow(), Readiness::Ready)
    }

    pub fn is_pending(&self) -> bool {
        matches!(*self.rx.borrow(), Readiness::Pending)
    }

    /// Wait until the attempt settles.
    ///
    /// Returns `Closed` when the attempt was abandoned (the resolver was dropped
    /// without settling, e.g. on disconnect).
    pub async fn wait(&self) -> Result<(), TrackerError> {
        let mut rx = self.rx.clone();
        let settled = rx
            .wait_for(|r| !matches!(r, Readiness::Pending))
            .await
            .map_err(|_| TrackerError::Closed)?;
        match &*settled {
            Readiness::Ready => Ok(()),
            Readiness::Failed(e) => Err(e.clone()),
            Readiness::Pending => Err(TrackerError::Closed),
        }
    }
}
