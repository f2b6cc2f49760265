use std::{
    future::Future,
    sync::atomic::{AtomicU64, Ordering},
};

use crate::models::NavigationDecision;

/// AttemptId
///
/// Identifies one navigation attempt handed out by a `NavigationSequencer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct AttemptId(u64);

/// NavigationSequencer
///
/// Helps a host router act on at most one decision per logical navigation.
/// Each attempt takes a ticket; a decision is only worth acting on while its ticket
/// is still the newest. Rapid clicks therefore cannot let a slow, stale evaluation
/// override the outcome of a newer one.
#[derive(Debug, Default)]
pub struct NavigationSequencer {
    latest: AtomicU64,
}

impl NavigationSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new attempt, superseding every earlier one.
    pub fn begin(&self) -> AttemptId {
        AttemptId(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, attempt: AttemptId) -> bool {
        self.latest.load(Ordering::SeqCst) == attempt.0
    }

    /// run
    ///
    /// Registers `decision` as a fresh attempt and returns a future resolving to it,
    /// or to `None` when a newer attempt began before it finished. The ticket is taken
    /// when `run` is called, not on first poll, so attempts are ordered by creation.
    pub fn run<F>(&self, decision: F) -> impl Future<Output = Option<NavigationDecision>>
    where
        F: Future<Output = NavigationDecision>,
    {
        let attempt = self.begin();
        async move {
            let decision = decision.await;
            if self.is_current(attempt) {
                Some(decision)
            } else {
                tracing::debug!(?attempt, "discarding decision of superseded navigation");
                None
            }
        }
    }
}
