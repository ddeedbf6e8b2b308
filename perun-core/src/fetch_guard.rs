//! Discards results of superseded requests.
//!
//! Every request takes a [`Ticket`]; only the result carrying the most
//! recently issued ticket is accepted. A slow response for a job the user has
//! already navigated away from is dropped instead of overwriting newer data.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

/// Ticket dispenser; clones share the same counter
#[derive(Debug, Clone, Default)]
pub struct LatestOnly {
    latest: Arc<AtomicU64>,
}

impl LatestOnly {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request, superseding every earlier ticket
    pub fn issue(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    /// Pass `value` through only if `ticket` is still the latest
    pub fn accept<T>(&self, ticket: Ticket, value: T) -> Option<T> {
        if self.is_current(ticket) {
            Some(value)
        } else {
            debug!("Discarding stale result for request {}", ticket.0);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_latest_ticket_is_accepted() {
        let guard = LatestOnly::new();
        let first = guard.issue();
        let second = guard.issue();
        assert!(first < second);
        assert_eq!(guard.accept(first, "old"), None);
        assert_eq!(guard.accept(second, "new"), Some("new"));
    }

    #[test]
    fn test_clones_share_counter() {
        let guard = LatestOnly::new();
        let ticket = guard.issue();
        let other = guard.clone();
        other.issue();
        assert!(!guard.is_current(ticket));
    }
}
