use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use strum::Display;
use tracing::warn;
use utoipa::ToSchema;

/// Phases of a single checkout attempt.
///
/// `Confirmed` and `Rejected` are terminal; `Stalled` is recoverable only by
/// retrying the whole flow from `Draft`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, ToSchema)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CheckoutPhase {
    Draft,
    PendingUpstream,
    AwaitingCapture,
    Verifying,
    Confirmed,
    Rejected,
    Stalled,
}

impl CheckoutPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Confirmed | Self::Rejected)
    }

    pub fn can_transition(self, next: Self) -> bool {
        use CheckoutPhase::*;
        matches!(
            (self, next),
            (Draft, PendingUpstream)
                | (PendingUpstream, AwaitingCapture)
                | (PendingUpstream, Stalled)
                | (AwaitingCapture, Verifying)
                | (Verifying, Confirmed)
                | (Verifying, Rejected)
                | (Verifying, Stalled)
                // Retrying the whole flow restarts from Draft.
                | (Stalled, PendingUpstream)
                | (AwaitingCapture, PendingUpstream)
        )
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Attempt {
    pub phase: CheckoutPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commerce_order_id: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Attempt {
    fn default() -> Self {
        Self {
            phase: CheckoutPhase::Draft,
            commerce_order_id: None,
            updated_at: Utc::now(),
        }
    }
}

/// Session-keyed record of where each checkout attempt stands.
///
/// Purely observational: irregular transitions (the classic one being a
/// second submission while an attempt is already in flight) are logged but
/// never blocked, matching the unguarded behavior of the flow itself.
#[derive(Debug, Clone, Default)]
pub struct AttemptTracker {
    attempts: Arc<DashMap<String, Attempt>>,
}

impl AttemptTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, session_id: &str) -> Attempt {
        self.attempts
            .get(session_id)
            .map(|a| a.clone())
            .unwrap_or_default()
    }

    pub fn transition(&self, session_id: &str, next: CheckoutPhase, order_id: Option<i64>) {
        let mut entry = self.attempts.entry(session_id.to_string()).or_default();
        if !entry.phase.can_transition(next) && entry.phase != next {
            warn!(
                session_id = %session_id,
                from = %entry.phase,
                to = %next,
                "irregular checkout phase transition (possible duplicate submission)"
            );
        }
        entry.phase = next;
        if order_id.is_some() {
            entry.commerce_order_id = order_id;
        }
        entry.updated_at = Utc::now();
    }

    pub fn session_count(&self) -> usize {
        self.attempts.len()
    }

    /// Drops attempts untouched within `idle`; returns how many were
    /// evicted. Run periodically by the janitor task.
    pub fn evict_idle(&self, idle: chrono::Duration) -> usize {
        let cutoff = Utc::now() - idle;
        let before = self.attempts.len();
        self.attempts.retain(|_, attempt| attempt.updated_at > cutoff);
        before - self.attempts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use CheckoutPhase::*;

    #[test]
    fn happy_path_transitions_are_legal() {
        for (from, to) in [
            (Draft, PendingUpstream),
            (PendingUpstream, AwaitingCapture),
            (AwaitingCapture, Verifying),
            (Verifying, Confirmed),
        ] {
            assert!(from.can_transition(to), "{} -> {} should be legal", from, to);
        }
    }

    #[test]
    fn terminal_phases_do_not_progress() {
        for terminal in [Confirmed, Rejected] {
            assert!(terminal.is_terminal());
            for next in [Draft, PendingUpstream, AwaitingCapture, Verifying, Stalled] {
                assert!(!terminal.can_transition(next));
            }
        }
    }

    #[test]
    fn stalled_recovers_only_by_restarting() {
        assert!(Stalled.can_transition(PendingUpstream));
        assert!(!Stalled.can_transition(Verifying));
        assert!(!Stalled.can_transition(Confirmed));
    }

    #[test]
    fn tracker_records_order_id_and_phase() {
        let tracker = AttemptTracker::new();
        tracker.transition("s1", PendingUpstream, Some(42));
        tracker.transition("s1", AwaitingCapture, None);

        let attempt = tracker.get("s1");
        assert_eq!(attempt.phase, AwaitingCapture);
        assert_eq!(attempt.commerce_order_id, Some(42));
    }

    #[test]
    fn unknown_session_reads_as_draft() {
        let tracker = AttemptTracker::new();
        assert_eq!(tracker.get("nope").phase, Draft);
    }

    #[test]
    fn idle_attempts_are_evicted() {
        let tracker = AttemptTracker::new();
        tracker.transition("s1", PendingUpstream, Some(1));

        assert_eq!(tracker.evict_idle(chrono::Duration::hours(1)), 0);
        assert_eq!(tracker.evict_idle(chrono::Duration::zero()), 1);
        assert_eq!(tracker.session_count(), 0);
        // A fresh read after eviction is back at Draft.
        assert_eq!(tracker.get("s1").phase, Draft);
    }

    #[test]
    fn irregular_transition_is_not_blocked() {
        let tracker = AttemptTracker::new();
        tracker.transition("s1", PendingUpstream, Some(1));
        // Second submission while the first is in flight: logged, not blocked.
        tracker.transition("s1", PendingUpstream, Some(2));
        assert_eq!(tracker.get("s1").commerce_order_id, Some(2));
    }
}
