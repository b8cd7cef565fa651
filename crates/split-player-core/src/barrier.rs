//! Readiness barrier
//!
//! Counts videos that completed their ready handshake against the number of
//! videos in the player. Transport commands are only honored while the two
//! match.

use crate::error::Rejection;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadinessBarrier {
    ready: usize,
    total: usize,
}

impl ReadinessBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A video joined; it is not ready yet
    pub fn register(&mut self) {
        self.total += 1;
    }

    /// A registered video completed its handshake.
    ///
    /// Returns true when this call brought the barrier to satisfied.
    pub fn mark_ready(&mut self) -> bool {
        if self.ready < self.total {
            self.ready += 1;
        }
        self.is_satisfied()
    }

    /// A video left. Only videos that had completed their handshake count
    /// towards `ready`.
    pub fn unregister(&mut self, was_ready: bool) {
        self.total = self.total.saturating_sub(1);
        if was_ready {
            self.ready = self.ready.saturating_sub(1);
        }
        self.ready = self.ready.min(self.total);
    }

    pub fn is_satisfied(&self) -> bool {
        self.ready == self.total
    }

    /// Gate for transport commands
    pub fn check(&self) -> Result<(), Rejection> {
        if self.is_satisfied() {
            Ok(())
        } else {
            Err(Rejection::NotReady {
                ready: self.ready,
                total: self.total,
            })
        }
    }

    pub fn ready(&self) -> usize {
        self.ready
    }

    pub fn total(&self) -> usize {
        self.total
    }
}
