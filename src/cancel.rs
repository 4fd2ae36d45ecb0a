use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Shared interruption flag, set from the Ctrl+C handler.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
    transfers: Arc<AtomicUsize>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Cancels and returns whether a transfer is in flight that will notice
    /// the flag and clean up its partial file.
    pub fn interrupt(&self) -> bool {
        self.cancel();
        self.transfers.load(Ordering::SeqCst) > 0
    }

    /// Marks a transfer as in flight until the guard is dropped.
    pub fn transfer(&self) -> TransferGuard {
        self.transfers.fetch_add(1, Ordering::SeqCst);
        TransferGuard(Arc::clone(&self.transfers))
    }
}

pub struct TransferGuard(Arc<AtomicUsize>);

impl Drop for TransferGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::CancelFlag;

    #[test]
    fn interrupt_reports_transfers_in_flight() {
        let idle = CancelFlag::new();
        assert!(!idle.interrupt());
        assert!(idle.is_cancelled());

        let busy = CancelFlag::new();
        let handler_side = busy.clone();
        let guard = busy.transfer();
        assert!(handler_side.interrupt());
        drop(guard);
        assert!(!handler_side.interrupt());
    }
}
