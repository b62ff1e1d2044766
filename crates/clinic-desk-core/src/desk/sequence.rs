//! Refresh sequencing.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Proof that a refresh was issued. Only the latest ticket may apply its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

impl Ticket {
    pub fn number(&self) -> u64 {
        self.0
    }
}

/// Numbers refreshes so that the most recently issued one wins, whatever order the
/// responses arrive in. Once closed, no ticket is ever current again.
#[derive(Debug, Default)]
pub struct RefreshSequence {
    issued: AtomicU64,
    closed: AtomicBool,
}

impl RefreshSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket, superseding every earlier one.
    pub fn issue(&self) -> Ticket {
        Ticket(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Whether `ticket` is still the latest and the owner is still live.
    pub fn is_current(&self, ticket: Ticket) -> bool {
        !self.closed.load(Ordering::SeqCst) && self.issued.load(Ordering::SeqCst) == ticket.0
    }

    /// Supersede whatever is in flight without starting anything new.
    pub fn invalidate(&self) {
        self.issue();
    }

    /// Discard all in-flight and future completions.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
