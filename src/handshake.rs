/// Shared signal between the POS and wallet runners.
///
/// The signal starts held: the wallet's continuation prompt must not be
/// answered until the POS client has initiated the sale. The POS runner
/// releases the signal exactly once; extra releases saturate (no-ops).
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;

/// Binary semaphore representing "POS has initiated a sale".
///
/// Constructed held (zero permits). Passed by reference to both runner
/// tasks at construction time; no global state.
pub struct SaleSignal {
    permit: Semaphore,
    released: AtomicBool,
}

/// The signal was not released within the configured wait.
#[derive(Debug, PartialEq, Eq)]
pub struct SignalTimeout {
    /// How long the waiter was willing to wait.
    pub waited: Duration,
}

impl std::fmt::Display for SignalTimeout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "sale was not initiated within {}s",
            self.waited.as_secs_f64()
        )
    }
}

impl std::error::Error for SignalTimeout {}

impl SaleSignal {
    /// Create the signal in its held state.
    pub fn new() -> Self {
        Self {
            permit: Semaphore::new(0),
            released: AtomicBool::new(false),
        }
    }

    /// Release the signal, allowing one pending (or future) `wait` to proceed.
    ///
    /// Saturating: a second release is a no-op. External binaries have been
    /// seen printing their markers more than once, so this must not mint
    /// extra permits.
    pub fn release(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            tracing::warn!("sale signal released more than once, ignoring");
            return;
        }
        tracing::debug!("sale signal released");
        self.permit.add_permits(1);
    }

    /// Wait until the signal is released, consuming the permit.
    ///
    /// `timeout == None` waits unboundedly, matching the original runner
    /// behavior; `Some(d)` gives up after `d` with a `SignalTimeout`.
    pub async fn wait(&self, timeout: Option<Duration>) -> Result<(), SignalTimeout> {
        match timeout {
            None => {
                self.wait_unbounded().await;
                Ok(())
            }
            Some(waited) => tokio::time::timeout(waited, self.wait_unbounded())
                .await
                .map_err(|_| SignalTimeout { waited }),
        }
    }

    async fn wait_unbounded(&self) {
        // The semaphore is never closed, so acquire can only succeed.
        if let Ok(permit) = self.permit.acquire().await {
            permit.forget();
        }
    }
}

impl Default for SaleSignal {
    fn default() -> Self {
        Self::new()
    }
}
